// Concrete portal implementations. Each one registers itself in
// `PortalRegistry::with_builtin_portals`.

pub mod click_pay;
