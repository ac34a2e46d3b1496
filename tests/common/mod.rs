#![allow(dead_code)]

use httpmock::prelude::*;
use httpmock::Mock;
use rent_portal_sync::portals::click_pay::{ClickPay, ClickPayEndpoints};
use rent_portal_sync::{ContactRecord, Portal, PortalRegistry, RetrievalRequest};
use serde_json::{json, Value};
use std::time::Duration;

pub const SERVICE: &str = "/MobileService/Service.asmx";

pub fn service_path(endpoint: &str) -> String {
    format!("{}{}", SERVICE, endpoint)
}

/// 把 ClickPay 實作以 "examplePortal" 註冊，端點指向 mock server
pub fn example_registry(server: &MockServer) -> PortalRegistry {
    let endpoints = ClickPayEndpoints {
        base_url: server.url(SERVICE),
        landing_url: server.url("/app"),
    };

    let mut registry = PortalRegistry::new();
    registry.register("examplePortal", move |credential, context| {
        let portal: Box<dyn Portal> = Box::new(ClickPay::new(
            credential,
            context.connector(),
            endpoints.clone(),
        )?);
        Ok(portal)
    });
    registry
}

pub fn request() -> RetrievalRequest {
    serde_json::from_value(json!({
        "portalIdentifier": "examplePortal",
        "username": "user",
        "password": "pass"
    }))
    .expect("request fixture is valid")
}

pub fn expected_record() -> ContactRecord {
    ContactRecord {
        email: "a@b.com".to_string(),
        phone: "+1000".to_string(),
        management_company: "Acme Mgmt".to_string(),
        address: "12 Main St, Town - ST (00000)".to_string(),
    }
}

pub fn identity_body() -> Value {
    json!({"Result": {"user": {"Email": "a@b.com", "Cellphone": "+1000"}}})
}

pub fn property_body() -> Value {
    json!({"Result": {"Unit": {"Unit": {
        "SiteName": "Acme Mgmt",
        "StreetNumber": "12",
        "StreetName": "Main",
        "StreetTypeName": "St",
        "City": "Town",
        "State": "ST",
        "Zip": "00000"
    }}}})
}

pub fn token_markup(token: &str) -> String {
    format!(
        r#"<html><body><form id="aspnetForm">
<input type="hidden" name="__VIEWSTATE" value="xyz" />
<input type="hidden" name="ctl00$antiForgeryToken" id="ctl00_antiForgeryToken" value="{}" />
</form></body></html>"#,
        token
    )
}

pub fn mock_prepare<'a>(server: &'a MockServer, cookie: Option<&str>, delay: Duration) -> Mock<'a> {
    let set_cookie = cookie.map(|c| format!("__Secure-SessionId={}; Path=/; Secure; HttpOnly", c));
    server.mock(|when, then| {
        when.method(POST).path(service_path("/prepare_login"));
        let then = then.status(200).delay(delay);
        if let Some(set_cookie) = &set_cookie {
            then.header("Set-Cookie", set_cookie.as_str());
        }
    })
}

pub fn mock_login<'a>(server: &'a MockServer, status: u16) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(service_path("/login"))
            .header("cookie", "__Secure-SessionId=abc123")
            .json_body(json!({"username": "user", "password": "pass", "validateUsername": true}));
        then.status(status).json_body(json!({"d": null}));
    })
}

pub fn mock_landing<'a>(server: &'a MockServer, markup: String) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/app")
            .header("cookie", "__Secure-SessionId=abc123");
        then.status(200)
            .header("content-type", "text/html")
            .body(markup);
    })
}

pub fn mock_identity<'a>(server: &'a MockServer, body: Value, delay: Duration) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(service_path("/getUserContextJSON"))
            .header("cookie", "__Secure-SessionId=abc123")
            .header("antiforgerytoken", "tok456")
            .body("NovelPayApp");
        then.status(200).delay(delay).json_body(body);
    })
}

pub fn mock_property<'a>(server: &'a MockServer, body: Value, delay: Duration) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(service_path("/get_data_allow_impersonation_json"))
            .header("cookie", "__Secure-SessionId=abc123")
            .header("antiforgerytoken", "tok456")
            .json_body(json!({
                "RequestType": "get_user_paynow_desktop",
                "FilterByGroupLabel": "1",
                "GroupLabel": ""
            }));
        then.status(200).delay(delay).json_body(body);
    })
}

pub struct HappyPortal<'a> {
    pub prepare: Mock<'a>,
    pub login: Mock<'a>,
    pub landing: Mock<'a>,
    pub identity: Mock<'a>,
    pub property: Mock<'a>,
}

pub fn mock_happy_portal(server: &MockServer) -> HappyPortal<'_> {
    HappyPortal {
        prepare: mock_prepare(server, Some("abc123"), Duration::ZERO),
        login: mock_login(server, 200),
        landing: mock_landing(server, token_markup("tok456")),
        identity: mock_identity(server, identity_body(), Duration::ZERO),
        property: mock_property(server, property_body(), Duration::ZERO),
    }
}
