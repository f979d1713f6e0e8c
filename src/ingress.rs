//! C2 — Ingress Indexer.
//!
//! Groups ingress rule paths by backend service name, then sorts each
//! bucket by ascending path length so that the shortest path (typically
//! `"/"`) is preferred as the documentation-URL source (§4.2).

use std::collections::BTreeMap;

use k8s_openapi::api::extensions::v1beta1::Ingress;

use crate::model::IngressRecord;

/// A single `host + path` rule extracted from an ingress spec, before
/// grouping.
struct RawRule {
    service: String,
    host: String,
    path: String,
}

fn extract_rules(ingresses: &[Ingress]) -> Vec<RawRule> {
    let mut rules = Vec::new();
    for ing in ingresses {
        let spec = match &ing.spec {
            Some(s) => s,
            None => continue,
        };
        for rule in spec.rules.iter().flatten() {
            let host = rule.host.clone().unwrap_or_default();
            let http = match &rule.http {
                Some(h) => h,
                None => continue,
            };
            for path in &http.paths {
                let service = path.backend.service_name.clone();
                let p = path.path.clone().unwrap_or_default();
                rules.push(RawRule { service, host: host.clone(), path: p });
            }
        }
    }
    rules
}

/// Groups the ingress rules found across `ingresses` by backend service
/// name, and sorts each bucket by ascending `path.len()` — ties keep their
/// original (input) order, i.e. the sort is stable.
pub fn group_by_service(ingresses: &[Ingress]) -> BTreeMap<String, Vec<IngressRecord>> {
    let mut buckets: BTreeMap<String, Vec<IngressRecord>> = BTreeMap::new();
    for rule in extract_rules(&ingresses) {
        let record = IngressRecord {
            url: format!("{}{}", rule.host, rule.path),
            host: rule.host,
            path: rule.path,
            alive: false,
        };
        buckets.entry(rule.service).or_insert_with(Vec::new).push(record);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by_key(|r| r.path.len());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::extensions::v1beta1::{
        HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressRuleValue, IngressSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn ingress(host: &str, service: &str, path: &str) -> Ingress {
        Ingress {
            metadata: ObjectMeta::default(),
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(host.to_string()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            backend: IngressBackend {
                                service_name: service.to_string(),
                                service_port: k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(80),
                            },
                            path: Some(path.to_string()),
                        }],
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[test]
    fn sorts_buckets_by_ascending_path_length() {
        let ingresses = vec![
            ingress("keycloak.bla", "keycloak", "/blabla"),
            ingress("keycloak.om3", "keycloak", "/"),
        ];
        let grouped = group_by_service(&ingresses);
        let keycloak = &grouped["keycloak"];
        assert_eq!(keycloak[0].path, "/");
        assert_eq!(keycloak[1].path, "/blabla");
    }

    #[test]
    fn groups_distinct_services_independently() {
        let ingresses = vec![
            ingress("google.com", "flamingo", "/"),
            ingress("google.com", "akeneo", "/akeneo"),
        ];
        let grouped = group_by_service(&ingresses);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["flamingo"][0].url, "google.com/");
        assert_eq!(grouped["akeneo"][0].url, "google.com/akeneo");
    }
}
