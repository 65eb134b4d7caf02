//! Turns a materialized fixture into an [`HttpRequest`]

use moxter_core::config::EngineConfig;
use moxter_core::error::{Error, Result};
use moxter_core::model::{FixtureCall, HttpMethod};
use moxter_core::template::render;
use moxter_core::variables::VariableSource;
use url::form_urlencoded;

use crate::executor::{Credentials, HttpRequest, RequestBody};
use crate::payload::PayloadResolver;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";

/// Builds requests using engine-wide defaults for headers, auth and CSRF
pub struct RequestBuilder<'a> {
    config: &'a EngineConfig,
    payloads: &'a PayloadResolver,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a EngineConfig, payloads: &'a PayloadResolver) -> Self {
        Self { config, payloads }
    }

    pub fn build(&self, call: &FixtureCall, vars: &dyn VariableSource) -> Result<HttpRequest> {
        let method_text = call
            .method
            .as_deref()
            .ok_or_else(|| Error::invalid_fixture(&call.name, "missing method"))?;
        let method: HttpMethod = render(method_text, vars).parse()?;

        let endpoint = call
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::invalid_fixture(&call.name, "missing endpoint"))?;
        let url = append_query(&render(endpoint, vars), call, vars);

        let mut request = HttpRequest::new(method, url);

        for (name, value) in &self.config.http.default_headers {
            set_header(&mut request.headers, name, render(value, vars));
        }
        if let Some(headers) = &call.headers {
            for (name, value) in headers {
                set_header(&mut request.headers, name, render(&value.to_string(), vars));
            }
        }

        request.body = self.payloads.resolve(call.payload.as_ref(), vars)?;
        if matches!(request.body, Some(RequestBody::Json(_))) && request.header(CONTENT_TYPE).is_none() {
            request
                .headers
                .push((CONTENT_TYPE.to_string(), "application/json".to_string()));
        }

        // An explicit Authorization header replaces configured credentials.
        if request.header(AUTHORIZATION).is_none() {
            request.credentials = self.credentials();
        }

        let csrf = &self.config.csrf;
        if csrf.enabled && method.is_state_changing() && request.header(&csrf.header_name).is_none() {
            if let Some(token) = &csrf.token {
                request
                    .headers
                    .push((csrf.header_name.clone(), token.clone()));
            }
        }

        Ok(request)
    }

    fn credentials(&self) -> Option<Credentials> {
        let auth = &self.config.auth;
        if let Some(token) = &auth.bearer_token {
            return Some(Credentials::Bearer(token.clone()));
        }
        match (&auth.basic_username, &auth.basic_password) {
            (Some(username), Some(password)) => Some(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Replaces any header with the same name (case-insensitively), else appends.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}

fn append_query(endpoint: &str, call: &FixtureCall, vars: &dyn VariableSource) -> String {
    let Some(query) = call.query.as_ref().filter(|q| !q.is_empty()) else {
        return endpoint.to_string();
    };
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        serializer.append_pair(key, &render(&value.to_string(), vars));
    }
    let encoded = serializer.finish();
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxter_core::model::TextValue;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn vars() -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("ownerId".to_string(), json!(5)),
            ("term".to_string(), json!("big dog")),
            ("verb".to_string(), json!("put")),
        ])
    }

    fn call() -> FixtureCall {
        FixtureCall {
            name: "update_owner".into(),
            method: Some("{{verb}}".into()),
            endpoint: Some("/api/owners/{{ownerId}}".into()),
            query: Some(BTreeMap::from([
                ("q".to_string(), TextValue::from("{{term}}")),
                ("page".to_string(), TextValue::Integer(2)),
            ])),
            headers: Some(BTreeMap::from([("accept".to_string(), TextValue::from("text/plain"))])),
            payload: Some(json!({"id": "{{ownerId}}"})),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_renders_everything() {
        let mut config = EngineConfig::default();
        config
            .http
            .default_headers
            .insert("Accept".to_string(), "application/json".to_string());
        let payloads = PayloadResolver::new("unused");
        let request = RequestBuilder::new(&config, &payloads)
            .build(&call(), &vars())
            .unwrap();

        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "/api/owners/5?page=2&q=big+dog");
        assert_eq!(request.header("Accept"), Some("text/plain"));
        assert_eq!(request.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("accept")).count(), 1);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body, Some(RequestBody::Json(json!({"id": 5}))));
        assert_eq!(request.credentials, None);
    }

    #[test]
    fn test_query_appends_to_existing_query_string() {
        let config = EngineConfig::default();
        let payloads = PayloadResolver::new("unused");
        let mut c = call();
        c.endpoint = Some("/api/owners?sort=name".into());
        let request = RequestBuilder::new(&config, &payloads).build(&c, &vars()).unwrap();
        assert_eq!(request.url, "/api/owners?sort=name&page=2&q=big+dog");
    }

    #[test]
    fn test_auth_and_csrf() {
        let mut config = EngineConfig::default();
        config.auth.bearer_token = Some("tok".to_string());
        config.csrf.enabled = true;
        config.csrf.token = Some("csrf-1".to_string());
        let payloads = PayloadResolver::new("unused");
        let builder = RequestBuilder::new(&config, &payloads);

        let put = builder.build(&call(), &vars()).unwrap();
        assert_eq!(put.credentials, Some(Credentials::Bearer("tok".to_string())));
        assert_eq!(put.header("X-CSRF-TOKEN"), Some("csrf-1"));

        let mut get = call();
        get.method = Some("GET".into());
        let get = builder.build(&get, &vars()).unwrap();
        assert_eq!(get.header("X-CSRF-TOKEN"), None);
    }

    #[test]
    fn test_explicit_authorization_header_wins() {
        let mut config = EngineConfig::default();
        config.auth.basic_username = Some("admin".to_string());
        config.auth.basic_password = Some("pw".to_string());
        let payloads = PayloadResolver::new("unused");
        let builder = RequestBuilder::new(&config, &payloads);

        assert!(matches!(
            builder.build(&call(), &vars()).unwrap().credentials,
            Some(Credentials::Basic { .. })
        ));

        let mut anonymous = call();
        anonymous
            .headers
            .get_or_insert_with(BTreeMap::new)
            .insert("Authorization".to_string(), TextValue::from("Bearer other"));
        let request = builder.build(&anonymous, &vars()).unwrap();
        assert_eq!(request.credentials, None);
        assert_eq!(request.header("authorization"), Some("Bearer other"));
    }

    #[test]
    fn test_bad_method_fails() {
        let config = EngineConfig::default();
        let payloads = PayloadResolver::new("unused");
        let mut c = call();
        c.method = Some("{{missing}}".into());
        assert!(RequestBuilder::new(&config, &payloads).build(&c, &vars()).is_err());
    }
}
