// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Built-in list presets for common Kubernetes kinds
//!
//! Rows are built from manifests as returned by `kubectl get -o json|yaml`
//! (a `kind: List`, a bare array or a single object). Each preset is just a
//! column schema over [`ResourceRow`]; the list engine does the rest.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::engine::SortState;
use crate::export::{ExportConfig, ManifestSource, ManifestStub, StubMetadata};
use crate::schema::{CellValue, Column, Schema, compare_text};

/// Placeholder for missing values, as kubectl prints them
pub const NONE: &str = "<none>";

const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

/// A known resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Plural name, also the layout table id
    pub name: &'static str,
    pub kind: &'static str,
    pub api_version: &'static str,
    pub aliases: &'static [&'static str],
    pub namespaced: bool,
}

const RESOURCES: &[ResourceKind] = &[
    ResourceKind {
        name: "pods",
        kind: "Pod",
        api_version: "v1",
        aliases: &["pod", "po"],
        namespaced: true,
    },
    ResourceKind {
        name: "replicasets",
        kind: "ReplicaSet",
        api_version: "apps/v1",
        aliases: &["replicaset", "rs"],
        namespaced: true,
    },
    ResourceKind {
        name: "deployments",
        kind: "Deployment",
        api_version: "apps/v1",
        aliases: &["deployment", "deploy"],
        namespaced: true,
    },
    ResourceKind {
        name: "services",
        kind: "Service",
        api_version: "v1",
        aliases: &["service", "svc"],
        namespaced: true,
    },
    ResourceKind {
        name: "ingresses",
        kind: "Ingress",
        api_version: "networking.k8s.io/v1",
        aliases: &["ingress", "ing"],
        namespaced: true,
    },
    ResourceKind {
        name: "nodes",
        kind: "Node",
        api_version: "v1",
        aliases: &["node", "no"],
        namespaced: false,
    },
    ResourceKind {
        name: "endpoints",
        kind: "Endpoints",
        api_version: "v1",
        aliases: &["endpoint", "ep"],
        namespaced: true,
    },
    ResourceKind {
        name: "persistentvolumes",
        kind: "PersistentVolume",
        api_version: "v1",
        aliases: &["persistentvolume", "pv", "pvs"],
        namespaced: false,
    },
    ResourceKind {
        name: "persistentvolumeclaims",
        kind: "PersistentVolumeClaim",
        api_version: "v1",
        aliases: &["persistentvolumeclaim", "pvc", "pvcs"],
        namespaced: true,
    },
    ResourceKind {
        name: "namespaces",
        kind: "Namespace",
        api_version: "v1",
        aliases: &["namespace", "ns"],
        namespaced: false,
    },
];

/// All built-in presets
pub fn list_resources() -> &'static [ResourceKind] {
    RESOURCES
}

/// Find a preset by plural name, alias or kind (case-insensitive)
pub fn resolve_resource(name: &str) -> Option<&'static ResourceKind> {
    let name = name.trim().to_lowercase();
    RESOURCES.iter().find(|r| {
        r.name == name || r.aliases.contains(&name.as_str()) || r.kind.eq_ignore_ascii_case(&name)
    })
}

/// Guess the preset from loaded rows: all rows must share one known kind
pub fn detect_resource(rows: &[ResourceRow]) -> Option<&'static ResourceKind> {
    let first = rows.first()?;
    if rows.iter().any(|r| r.kind != first.kind) {
        return None;
    }
    RESOURCES.iter().find(|r| r.kind == first.kind)
}

/// One Kubernetes object
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRow {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    /// Empty for cluster-scoped objects
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Seconds since `metadata.creationTimestamp` at load time
    pub age_seconds: Option<i64>,
    /// The manifest as loaded
    pub raw: Value,
}

impl ResourceRow {
    /// Build a row from a manifest; `now` fixes the age reference point
    pub fn from_manifest(raw: Value, now: DateTime<Utc>) -> Result<Self> {
        let Some(name) = raw.pointer("/metadata/name").and_then(Value::as_str) else {
            bail!("Resource has no metadata.name");
        };
        let str_at = |pointer: &str| {
            raw.pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let labels = raw
            .pointer("/metadata/labels")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let age_seconds = raw
            .pointer("/metadata/creationTimestamp")
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|created| now.signed_duration_since(created.with_timezone(&Utc)).num_seconds().max(0));

        Ok(Self {
            kind: str_at("/kind"),
            api_version: str_at("/apiVersion"),
            name: name.to_string(),
            namespace: str_at("/metadata/namespace"),
            labels,
            age_seconds,
            raw,
        })
    }

    /// `namespace/name`, or `name` for cluster-scoped objects
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    /// Look up a dotted path such as `status.phase` or `spec.ports.0.port`
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for part in path.split('.') {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    /// Display text of a field, `<none>` if missing
    pub fn text(&self, path: &str) -> String {
        match self.field(path) {
            Some(value) => format_value(value),
            None => NONE.to_string(),
        }
    }

    /// Numeric field, 0 if missing or not a number
    pub fn number(&self, path: &str) -> f64 {
        match self.field(path) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn array(&self, path: &str) -> &[Value] {
        self.field(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => NONE.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => NONE.to_string(),
        Value::Array(items) if items.is_empty() => NONE.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(format_value).collect::<Vec<_>>().join(",")
        }
        Value::Array(items) => format!("[{}]", items.len()),
        Value::Object(obj) if obj.is_empty() => NONE.to_string(),
        Value::Object(obj) => {
            let pairs: Vec<String> = obj
                .iter()
                .take(3)
                .map(|(k, v)| format!("{}={}", k, format_value(v)))
                .collect();
            if obj.len() > 3 {
                format!("{}...", pairs.join(","))
            } else {
                pairs.join(",")
            }
        }
    }
}

/// Compact age like kubectl: `42s`, `5m`, `3h`, `12d`
pub fn format_age(seconds: Option<i64>) -> String {
    match seconds {
        None => "<unknown>".to_string(),
        Some(secs) if secs < 60 => format!("{}s", secs),
        Some(secs) if secs < 3600 => format!("{}m", secs / 60),
        Some(secs) if secs < 86400 => format!("{}h", secs / 3600),
        Some(secs) => format!("{}d", secs / 86400),
    }
}

/// Parse rows out of JSON or (multi-document) YAML
pub fn load_rows(content: &str, now: DateTime<Utc>) -> Result<Vec<ResourceRow>> {
    let documents: Vec<Value> = match serde_json::from_str::<Value>(content) {
        Ok(value) => vec![value],
        Err(json_err) => {
            debug!(error = %json_err, "Input is not JSON, trying YAML");
            serde_yaml::Deserializer::from_str(content)
                .map(Value::deserialize)
                .collect::<std::result::Result<Vec<Value>, _>>()
                .context("Input is neither valid JSON nor valid YAML")?
        }
    };

    let mut rows = Vec::new();
    for document in documents {
        for item in flatten_document(document) {
            rows.push(ResourceRow::from_manifest(item, now)?);
        }
    }
    debug!(rows = rows.len(), "Loaded resources");
    Ok(rows)
}

/// Expand `kind: *List` documents and bare arrays into their items
fn flatten_document(document: Value) -> Vec<Value> {
    match document {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(mut obj) if obj.get("items").is_some_and(Value::is_array) => {
            // kubectl lists carry kind "PodList" etc.; items may omit their kind
            let item_kind = obj
                .get("kind")
                .and_then(Value::as_str)
                .and_then(|k| k.strip_suffix("List"))
                .filter(|k| !k.is_empty())
                .map(str::to_string);
            let item_api_version = obj.get("apiVersion").cloned();
            let Some(Value::Array(items)) = obj.remove("items") else {
                return Vec::new();
            };
            items
                .into_iter()
                .map(|mut item| {
                    if let Value::Object(fields) = &mut item {
                        if let Some(kind) = &item_kind {
                            fields
                                .entry("kind")
                                .or_insert_with(|| Value::String(kind.clone()));
                        }
                        if let Some(api_version) = &item_api_version {
                            fields
                                .entry("apiVersion")
                                .or_insert_with(|| api_version.clone());
                        }
                    }
                    item
                })
                .collect()
        }
        other => vec![other],
    }
}

/// Default sort for every preset
pub fn default_sort() -> SortState {
    SortState::ascending("name")
}

/// Column schema for a resource name or alias; unknown kinds get a generic schema
pub fn schema_for(resource: &str) -> Result<Schema<ResourceRow>> {
    let columns = match resolve_resource(resource).map(|r| r.name) {
        Some("pods") => pods_columns(),
        Some("replicasets") => replicasets_columns(),
        Some("deployments") => deployments_columns(),
        Some("services") => services_columns(),
        Some("ingresses") => ingresses_columns(),
        Some("nodes") => nodes_columns(),
        Some("endpoints") => endpoints_columns(),
        Some("persistentvolumes") => persistentvolumes_columns(),
        Some("persistentvolumeclaims") => persistentvolumeclaims_columns(),
        Some("namespaces") => namespaces_columns(),
        _ => generic_columns(),
    };
    Schema::new(columns, ResourceRow::key)
        .with_context(|| format!("Invalid column schema for '{}'", resource))
}

/// Export settings for a resource list: CSV/JSON of the columns plus YAML stubs
pub fn export_config(resource: &str, schema: &Schema<ResourceRow>) -> ExportConfig<ResourceRow> {
    let base_name = resolve_resource(resource)
        .map(|r| r.name.to_string())
        .unwrap_or_else(|| resource.to_lowercase());
    let fallback = resolve_resource(resource).copied();

    ExportConfig::from_schema(&base_name, schema).with_manifest_stub(move |row: &ResourceRow| {
        let (kind, api_version) = match (row.kind.is_empty(), fallback) {
            (true, Some(r)) => (r.kind.to_string(), r.api_version.to_string()),
            _ => (row.kind.clone(), row.api_version.clone()),
        };
        ManifestStub {
            api_version,
            kind,
            metadata: StubMetadata {
                name: row.name.clone(),
                namespace: (!row.namespace.is_empty()).then(|| row.namespace.clone()),
                labels: row.labels.clone(),
            },
        }
    })
}

/// Full manifests from the loaded input, keyed like [`ResourceRow::key`]
pub struct LoadedManifests<'a> {
    rows: &'a [ResourceRow],
}

impl<'a> LoadedManifests<'a> {
    pub fn new(rows: &'a [ResourceRow]) -> Self {
        Self { rows }
    }
}

impl ManifestSource for LoadedManifests<'_> {
    fn full_manifest(&self, key: &str) -> Result<String> {
        let Some(row) = self.rows.iter().find(|r| r.key() == key) else {
            bail!("No resource with key '{}'", key);
        };
        serde_yaml::to_string(&row.raw).context("Failed to serialize manifest")
    }
}

// Column helpers

fn name_column() -> Column<ResourceRow> {
    Column::text("name", "Name", |r: &ResourceRow| r.name.clone())
        .sortable()
        .always_visible()
        .width(240, 120)
}

fn namespace_column() -> Column<ResourceRow> {
    Column::text("namespace", "Namespace", |r: &ResourceRow| r.namespace.clone())
        .sortable()
        .filterable()
        .width(160, 80)
}

fn age_column() -> Column<ResourceRow> {
    Column::custom(
        "age",
        "Age",
        |r: &ResourceRow| CellValue::Text(format_age(r.age_seconds)),
        // Unknown ages sort as oldest
        |a: &ResourceRow, b: &ResourceRow| {
            a.age_seconds
                .unwrap_or(i64::MAX)
                .cmp(&b.age_seconds.unwrap_or(i64::MAX))
        },
    )
    .sortable()
    .width(80, 60)
}

fn text_column(id: &str, label: &str, path: &'static str) -> Column<ResourceRow> {
    Column::text(id, label, move |r: &ResourceRow| r.text(path))
}

fn number_column(id: &str, label: &str, path: &'static str) -> Column<ResourceRow> {
    Column::number(id, label, move |r: &ResourceRow| r.number(path))
        .sortable()
        .width(100, 60)
}

/// "ready/total" column ordered by ratio, then by counts
fn ready_column<F>(counts: F) -> Column<ResourceRow>
where
    F: Fn(&ResourceRow) -> (u64, u64) + Send + Sync + Clone + 'static,
{
    let display = counts.clone();
    Column::custom(
        "ready",
        "Ready",
        move |r: &ResourceRow| {
            let (ready, total) = display(r);
            CellValue::Text(format!("{}/{}", ready, total))
        },
        move |a: &ResourceRow, b: &ResourceRow| compare_ready(counts(a), counts(b)),
    )
    .sortable()
    .width(90, 60)
}

fn compare_ready(a: (u64, u64), b: (u64, u64)) -> Ordering {
    let ratio = |(ready, total): (u64, u64)| {
        if total == 0 { 0.0 } else { ready as f64 / total as f64 }
    };
    ratio(a)
        .total_cmp(&ratio(b))
        .then(a.0.cmp(&b.0))
        .then(a.1.cmp(&b.1))
}

/// Storage quantity column ("10Gi", "500M") ordered by size
fn quantity_column(id: &str, label: &str, path: &'static str) -> Column<ResourceRow> {
    Column::custom(
        id,
        label,
        move |r: &ResourceRow| CellValue::Text(r.text(path)),
        move |a: &ResourceRow, b: &ResourceRow| {
            let qa = parse_quantity(&a.text(path));
            let qb = parse_quantity(&b.text(path));
            match (qa, qb) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => compare_text(&a.text(path), &b.text(path)),
            }
        },
    )
    .sortable()
    .width(100, 60)
}

/// Parse a Kubernetes quantity into bytes (or plain units)
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
        ("m", 1e-3),
    ];
    let quantity = quantity.trim();
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }
    quantity.parse::<f64>().ok()
}

// Per-kind column sets

fn pods_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        ready_column(|r: &ResourceRow| {
            let ready = r
                .array("status.containerStatuses")
                .iter()
                .filter(|cs| cs.get("ready").and_then(Value::as_bool).unwrap_or(false))
                .count() as u64;
            (ready, r.array("spec.containers").len() as u64)
        }),
        Column::text("status", "Status", |r: &ResourceRow| {
            match r.field("status.phase").and_then(Value::as_str) {
                Some(phase) if !phase.is_empty() => phase.to_string(),
                _ => "Unknown".to_string(),
            }
        })
        .sortable()
        .filterable()
        .width(110, 70),
        Column::number("restarts", "Restarts", |r: &ResourceRow| {
            r.array("status.containerStatuses")
                .iter()
                .filter_map(|cs| cs.get("restartCount").and_then(Value::as_f64))
                .sum()
        })
        .sortable()
        .filterable()
        .width(90, 60),
        age_column(),
        text_column("ip", "IP", "status.podIP").hidden(),
        text_column("node", "Node", "spec.nodeName")
            .sortable()
            .filterable(),
    ]
}

fn replicasets_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        number_column("desired", "Desired", "spec.replicas"),
        number_column("current", "Current", "status.replicas"),
        number_column("ready", "Ready", "status.readyReplicas"),
        age_column(),
    ]
}

fn deployments_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        ready_column(|r: &ResourceRow| {
            (
                r.number("status.readyReplicas") as u64,
                r.number("spec.replicas") as u64,
            )
        }),
        number_column("up-to-date", "Up-to-date", "status.updatedReplicas"),
        number_column("available", "Available", "status.availableReplicas"),
        age_column(),
        text_column("strategy", "Strategy", "spec.strategy.type")
            .sortable()
            .filterable()
            .hidden(),
    ]
}

fn services_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        text_column("type", "Type", "spec.type")
            .sortable()
            .filterable(),
        text_column("cluster-ip", "Cluster IP", "spec.clusterIP").sortable(),
        Column::text("ports", "Ports", |r: &ResourceRow| {
            let ports: Vec<String> = r
                .array("spec.ports")
                .iter()
                .map(|p| {
                    let port = p.get("port").map(format_value).unwrap_or_default();
                    let protocol = p.get("protocol").and_then(Value::as_str).unwrap_or("TCP");
                    format!("{}/{}", port, protocol)
                })
                .collect();
            if ports.is_empty() { NONE.to_string() } else { ports.join(",") }
        }),
        age_column(),
    ]
}

fn ingresses_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        text_column("class", "Class", "spec.ingressClassName")
            .sortable()
            .filterable(),
        Column::text("hosts", "Hosts", |r: &ResourceRow| {
            let hosts: Vec<&str> = r
                .array("spec.rules")
                .iter()
                .filter_map(|rule| rule.get("host").and_then(Value::as_str))
                .filter(|h| !h.is_empty())
                .collect();
            if hosts.is_empty() { NONE.to_string() } else { hosts.join(",") }
        })
        .sortable(),
        Column::text("address", "Address", |r: &ResourceRow| {
            let first = r.array("status.loadBalancer.ingress").first();
            first
                .and_then(|lb| {
                    lb.get("ip")
                        .or_else(|| lb.get("hostname"))
                        .and_then(Value::as_str)
                })
                .unwrap_or(NONE)
                .to_string()
        }),
        Column::text("ports", "Ports", |r: &ResourceRow| {
            let ports = if r.array("spec.tls").is_empty() { "80" } else { "80,443" };
            ports.to_string()
        })
        .hidden(),
        age_column(),
    ]
}

fn nodes_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        Column::text("status", "Status", |r: &ResourceRow| {
            let ready = r.array("status.conditions").iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Ready")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            });
            let status = if ready { "Ready" } else { "NotReady" };
            status.to_string()
        })
        .sortable()
        .filterable(),
        Column::text("roles", "Roles", |r: &ResourceRow| {
            let roles: Vec<&str> = r
                .labels
                .keys()
                .filter_map(|k| k.strip_prefix(NODE_ROLE_PREFIX))
                .filter(|role| !role.is_empty())
                .collect();
            if roles.is_empty() { NONE.to_string() } else { roles.join(",") }
        })
        .sortable()
        .filterable(),
        age_column(),
        text_column("version", "Version", "status.nodeInfo.kubeletVersion")
            .sortable()
            .filterable(),
    ]
}

fn endpoints_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        Column::text("endpoints", "Endpoints", |r: &ResourceRow| {
            let mut endpoints = Vec::new();
            for subset in r.array("subsets") {
                let ports: Vec<String> = subset
                    .get("ports")
                    .and_then(Value::as_array)
                    .map(|ps| ps.iter().filter_map(|p| p.get("port")).map(format_value).collect())
                    .unwrap_or_default();
                let addresses = subset.get("addresses").and_then(Value::as_array);
                for address in addresses.into_iter().flatten() {
                    let ip = address.get("ip").and_then(Value::as_str).unwrap_or_default();
                    if ports.is_empty() {
                        endpoints.push(ip.to_string());
                    } else {
                        endpoints.extend(ports.iter().map(|p| format!("{}:{}", ip, p)));
                    }
                }
            }
            match endpoints.len() {
                0 => NONE.to_string(),
                n if n > 3 => format!("{} + {} more...", endpoints[..3].join(","), n - 3),
                _ => endpoints.join(","),
            }
        })
        .width(260, 100),
        age_column(),
    ]
}

fn persistentvolumes_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        quantity_column("capacity", "Capacity", "spec.capacity.storage"),
        text_column("access-modes", "Access Modes", "spec.accessModes").filterable(),
        text_column("reclaim-policy", "Reclaim Policy", "spec.persistentVolumeReclaimPolicy")
            .sortable()
            .filterable(),
        text_column("status", "Status", "status.phase")
            .sortable()
            .filterable(),
        Column::text("claim", "Claim", |r: &ResourceRow| {
            match (
                r.field("spec.claimRef.namespace").and_then(Value::as_str),
                r.field("spec.claimRef.name").and_then(Value::as_str),
            ) {
                (Some(ns), Some(name)) => format!("{}/{}", ns, name),
                (None, Some(name)) => name.to_string(),
                _ => NONE.to_string(),
            }
        })
        .sortable(),
        text_column("storage-class", "Storage Class", "spec.storageClassName")
            .sortable()
            .filterable(),
        age_column(),
    ]
}

fn persistentvolumeclaims_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        text_column("status", "Status", "status.phase")
            .sortable()
            .filterable(),
        text_column("volume", "Volume", "spec.volumeName").sortable(),
        quantity_column("capacity", "Capacity", "status.capacity.storage"),
        text_column("access-modes", "Access Modes", "status.accessModes")
            .filterable()
            .hidden(),
        text_column("storage-class", "Storage Class", "spec.storageClassName")
            .sortable()
            .filterable(),
        age_column(),
    ]
}

fn namespaces_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        text_column("status", "Status", "status.phase")
            .sortable()
            .filterable(),
        age_column(),
    ]
}

fn generic_columns() -> Vec<Column<ResourceRow>> {
    vec![
        name_column(),
        namespace_column(),
        Column::text("kind", "Kind", |r: &ResourceRow| r.kind.clone())
            .sortable()
            .filterable(),
        Column::text("api-version", "API Version", |r: &ResourceRow| r.api_version.clone())
            .filterable()
            .hidden(),
        age_column(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FilterState, SortState, compute};
    use crate::export::{ExportFormat, download_full_manifest, export_rows};
    use crate::selection::Selection;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const POD_LIST: &str = r#"{
        "apiVersion": "v1",
        "kind": "PodList",
        "items": [
            {
                "metadata": {"name": "web-1", "namespace": "prod", "creationTimestamp": "2025-06-01T11:59:30Z",
                             "labels": {"app": "web"}},
                "spec": {"nodeName": "node-a", "containers": [{"name": "a"}, {"name": "b"}]},
                "status": {"phase": "Running", "podIP": "10.0.0.1",
                           "containerStatuses": [{"ready": true, "restartCount": 2}, {"ready": true, "restartCount": 1}]}
            },
            {
                "metadata": {"name": "web-2", "namespace": "prod", "creationTimestamp": "2025-05-30T12:00:00Z"},
                "spec": {"nodeName": "node-b", "containers": [{"name": "a"}, {"name": "b"}]},
                "status": {"phase": "Running",
                           "containerStatuses": [{"ready": true, "restartCount": 0}, {"ready": false, "restartCount": 7}]}
            },
            {
                "metadata": {"name": "batch", "namespace": "jobs", "creationTimestamp": "2025-06-01T09:00:00Z"},
                "spec": {"containers": [{"name": "a"}]},
                "status": {"phase": "Pending"}
            }
        ]
    }"#;

    fn pods() -> Vec<ResourceRow> {
        load_rows(POD_LIST, now()).unwrap()
    }

    fn column_text(schema: &Schema<ResourceRow>, id: &str, row: &ResourceRow) -> String {
        schema.column(id).unwrap().text_value(row)
    }

    #[test]
    fn test_resolve_resource_aliases() {
        assert_eq!(resolve_resource("po").unwrap().name, "pods");
        assert_eq!(resolve_resource("deploy").unwrap().name, "deployments");
        assert_eq!(resolve_resource("PVC").unwrap().name, "persistentvolumeclaims");
        assert_eq!(resolve_resource("Ingress").unwrap().name, "ingresses");
        assert!(resolve_resource("widgets").is_none());
    }

    #[test]
    fn test_all_presets_build_valid_schemas() {
        for resource in list_resources() {
            let schema = schema_for(resource.name).unwrap();
            assert!(schema.column("name").is_some(), "{} has no name column", resource.name);
            assert_eq!(schema.column("namespace").is_some(), resource.namespaced);
            assert!(schema.is_sortable(&default_sort().key));
        }
        assert!(schema_for("widgets").unwrap().column("kind").is_some());
    }

    #[test]
    fn test_load_list_fills_item_kind() {
        let rows = pods();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kind, "Pod");
        assert_eq!(rows[0].api_version, "v1");
        assert_eq!(rows[0].key(), "prod/web-1");
        assert_eq!(rows[0].labels["app"], "web");
        assert_eq!(rows[0].age_seconds, Some(30));
        assert_eq!(detect_resource(&rows).unwrap().name, "pods");
    }

    #[test]
    fn test_load_yaml_documents_and_arrays() {
        let yaml = "apiVersion: v1\nkind: Node\nmetadata:\n  name: node-a\n---\napiVersion: v1\nkind: Node\nmetadata:\n  name: node-b\n";
        let rows = load_rows(yaml, now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].key(), "node-b");
        assert!(rows[1].age_seconds.is_none());

        let array = r#"[{"kind": "Namespace", "metadata": {"name": "default"}}]"#;
        assert_eq!(load_rows(array, now()).unwrap()[0].name, "default");
    }

    #[test]
    fn test_load_rejects_nameless_objects_and_garbage() {
        assert!(load_rows(r#"{"kind": "Pod", "metadata": {}}"#, now()).is_err());
        assert!(load_rows("{ not: [valid", now()).is_err());
    }

    #[test]
    fn test_field_paths() {
        let rows = pods();
        assert_eq!(rows[0].text("status.phase"), "Running");
        assert_eq!(rows[0].text("spec.containers.1.name"), "b");
        assert_eq!(rows[0].text("spec.missing"), NONE);
        assert_eq!(rows[0].number("status.containerStatuses.0.restartCount"), 2.0);
        assert_eq!(rows[0].text("metadata.labels"), "app=web");
    }

    #[test]
    fn test_pod_columns() {
        let rows = pods();
        let schema = schema_for("pods").unwrap();
        assert_eq!(column_text(&schema, "ready", &rows[0]), "2/2");
        assert_eq!(column_text(&schema, "ready", &rows[1]), "1/2");
        assert_eq!(column_text(&schema, "ready", &rows[2]), "0/1");
        assert_eq!(column_text(&schema, "restarts", &rows[1]), "7");
        assert_eq!(column_text(&schema, "age", &rows[0]), "30s");
        assert_eq!(column_text(&schema, "age", &rows[1]), "2d");
        assert_eq!(column_text(&schema, "node", &rows[2]), NONE);
    }

    #[test]
    fn test_sort_by_ready_and_age() {
        let rows = pods();
        let schema = schema_for("pods").unwrap();
        let filters = FilterState::new();

        let by_ready = compute(&rows, &schema, &filters, Some(&SortState::descending("ready")));
        let names: Vec<&str> = by_ready.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2", "batch"]);

        // Youngest first
        let by_age = compute(&rows, &schema, &filters, Some(&SortState::ascending("age")));
        let names: Vec<&str> = by_age.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "batch", "web-2"]);
    }

    #[test]
    fn test_status_facets() {
        let rows = pods();
        let schema = schema_for("po").unwrap();
        let view = compute(&rows, &schema, &FilterState::new(), None);
        assert_eq!(view.value_counts_by_column["status"]["Running"], 2);
        assert_eq!(view.value_counts_by_column["namespace"]["jobs"], 1);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("1Ki"), Some(1024.0));
        assert_eq!(parse_quantity("2G"), Some(2e9));
        assert_eq!(parse_quantity("500"), Some(500.0));
        assert_eq!(parse_quantity("lots"), None);
        assert!(parse_quantity("10Gi").unwrap() > parse_quantity("900Mi").unwrap());
    }

    #[test]
    fn test_capacity_sorts_by_size() {
        let list = r#"{"kind": "PersistentVolumeList", "apiVersion": "v1", "items": [
            {"metadata": {"name": "small"}, "spec": {"capacity": {"storage": "900Mi"}}},
            {"metadata": {"name": "big"}, "spec": {"capacity": {"storage": "10Gi"}}},
            {"metadata": {"name": "mid"}, "spec": {"capacity": {"storage": "1Gi"}}}
        ]}"#;
        let rows = load_rows(list, now()).unwrap();
        let schema = schema_for("pv").unwrap();
        let view = compute(&rows, &schema, &FilterState::new(), Some(&SortState::ascending("capacity")));
        let names: Vec<&str> = view.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["small", "mid", "big"]);
    }

    #[test]
    fn test_node_columns() {
        let node = r#"{"kind": "Node", "apiVersion": "v1", "metadata": {"name": "cp-1",
            "labels": {"node-role.kubernetes.io/control-plane": "", "kubernetes.io/os": "linux"}},
            "status": {"conditions": [{"type": "Ready", "status": "True"}],
                       "nodeInfo": {"kubeletVersion": "v1.31.0"}}}"#;
        let rows = load_rows(node, now()).unwrap();
        let schema = schema_for("nodes").unwrap();
        assert_eq!(column_text(&schema, "status", &rows[0]), "Ready");
        assert_eq!(column_text(&schema, "roles", &rows[0]), "control-plane");
        assert_eq!(column_text(&schema, "version", &rows[0]), "v1.31.0");
    }

    #[test]
    fn test_service_ports() {
        let svc = r#"{"kind": "Service", "metadata": {"name": "api", "namespace": "prod"},
            "spec": {"type": "ClusterIP", "clusterIP": "10.96.0.10",
                     "ports": [{"port": 53, "protocol": "UDP"}, {"port": 443}]}}"#;
        let rows = load_rows(svc, now()).unwrap();
        let schema = schema_for("svc").unwrap();
        assert_eq!(column_text(&schema, "ports", &rows[0]), "53/UDP,443/TCP");
    }

    #[test]
    fn test_yaml_stub_differs_from_loaded_manifest() {
        let rows = pods();
        let schema = schema_for("pods").unwrap();
        let config = export_config("pods", &schema);
        let items: Vec<&ResourceRow> = rows.iter().collect();
        let mut selection = Selection::new();
        selection.toggle("prod/web-1");

        let stub = export_rows(&items, &selection, &config, ExportFormat::Yaml).unwrap();
        assert_eq!(stub.file_name, "pods.yaml");
        assert!(stub.content.contains("kind: Pod"));
        assert!(stub.content.contains("app: web"));
        assert!(!stub.content.contains("containerStatuses"));

        let full = download_full_manifest(&LoadedManifests::new(&rows), "prod/web-1").unwrap();
        assert!(full.contains("containerStatuses"));
        assert_ne!(full, stub.content);
        assert!(download_full_manifest(&LoadedManifests::new(&rows), "prod/missing").is_err());
    }
}
