//! Orchestrator manifest generation.
//!
//! Each service yields one multi-document manifest (Deployment, Service,
//! and optionally Ingress) plus, when the environment mounts a volume into
//! the service, a separate volume-claim document.

pub mod fixup;
pub mod templates;
mod tree;

use serde_yaml::{Mapping, Sequence, Value};
use topoc_common::constants;
use topoc_common::error::Result;
use topoc_common::warning::{Warnings, WarningKind};
use topoc_model::{Container, VolumeMapping};
use topoc_resolve::image::resolve_image;
use topoc_resolve::memory::memory_limit;
use topoc_resolve::{OutputForm, Scope, ServiceScope, resolve_variables};

pub use self::templates::Templates;
use self::tree::{first_at, mapping_at, put, sequence_at};

/// Rendered manifest files of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    /// File name of the service manifest.
    pub file_name: String,
    /// Serialized Deployment/Service/Ingress documents.
    pub contents: String,
    /// File name and contents of the volume claim, if any.
    pub volume_claim: Option<(String, String)>,
}

/// Name of the service manifest file.
#[must_use]
pub fn manifest_file_name(service: &str) -> String {
    format!("k8s-{service}.yaml")
}

/// Name of the volume claim manifest file.
#[must_use]
pub fn volume_claim_file_name(service: &str) -> String {
    format!("k8s-{service}-pv-claim.yaml")
}

/// Renders the manifests of the service in `scope`.
///
/// # Errors
///
/// Returns [`topoc_common::error::TopocError::Template`] if a template does
/// not have the expected shape, or a YAML error if serialization fails.
pub fn render_manifest(
    scope: &ServiceScope<'_>,
    templates: &Templates,
    warnings: &mut Warnings,
) -> Result<RenderedManifest> {
    let service = scope.service;
    let mut docs = templates.service_documents(service.ingress_path.is_some())?;
    let template = docs.template;
    let volume = service_volume(scope, warnings);

    fill_deployment(
        &mut docs.documents[docs.deployment],
        template,
        scope,
        volume,
        warnings,
    )?;

    let first = service.containers.first();
    fill_service(&mut docs.documents[docs.service], template, scope, first)?;

    if let Some(idx) = docs.ingress {
        match (service.ingress_path.as_deref(), first.and_then(Container::main_port)) {
            (Some(path), Some(port)) => {
                fill_ingress(&mut docs.documents[idx], template, &service.name, path, port)?;
            }
            _ => {
                warnings.push(scope.warning(WarningKind::IngressWithoutPort));
                let _ = docs.documents.remove(idx);
            }
        }
    }

    let volume_claim = match volume {
        Some(mapping) => Some((
            volume_claim_file_name(&service.name),
            render_volume_claim(scope, templates, mapping)?,
        )),
        None => None,
    };

    Ok(RenderedManifest {
        file_name: manifest_file_name(&service.name),
        contents: serialize_documents(docs.documents)?,
        volume_claim,
    })
}

/// Normalizes and serializes documents, separated by `---`.
///
/// # Errors
///
/// Returns a YAML error if a document cannot be serialized.
pub fn serialize_documents(documents: Vec<Value>) -> Result<String> {
    let mut parts = Vec::with_capacity(documents.len());
    for mut doc in documents {
        fixup::normalize(&mut doc);
        parts.push(serde_yaml::to_string(&doc)?);
    }
    Ok(parts.join("---\n"))
}

/// The volume mounted by the manifest: the last mapping for the service.
fn service_volume<'a>(
    scope: &ServiceScope<'a>,
    warnings: &mut Warnings,
) -> Option<&'a VolumeMapping> {
    let mappings: Vec<&VolumeMapping> = scope.environment.volumes_for(&scope.service.name).collect();
    let (last, shadowed) = mappings.split_last()?;
    for mapping in shadowed {
        warnings.push(scope.warning(WarningKind::ShadowedVolumeMapping {
            target: mapping.target.clone(),
        }));
    }
    Some(*last)
}

fn storage_name(service: &str) -> String {
    format!("{service}-pv-storage")
}

fn claim_name(service: &str) -> String {
    format!("{service}-pv-claim")
}

fn fill_deployment(
    doc: &mut Value,
    template: &str,
    scope: &ServiceScope<'_>,
    volume: Option<&VolumeMapping>,
    warnings: &mut Warnings,
) -> Result<()> {
    let name = scope.service.name.as_str();
    put(mapping_at(doc, template, &["metadata"])?, "name", name);
    let label_paths: [&[&str]; 3] = [
        &["metadata", "labels"],
        &["spec", "selector", "matchLabels"],
        &["spec", "template", "metadata", "labels"],
    ];
    for path in label_paths {
        put(mapping_at(doc, template, path)?, "app", name);
    }
    if let Some(replicas) = scope.service.replicas {
        put(mapping_at(doc, template, &["spec"])?, "replicas", replicas);
    }

    let base = sequence_at(doc, template, &["spec", "template", "spec", "containers"])?
        .first()
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();

    let mut containers = Sequence::new();
    for (idx, container) in scope.service.containers.iter().enumerate() {
        let start = if idx == 0 { base.clone() } else { Mapping::new() };
        let rendered = render_container(start, &scope.container(container), volume, warnings);
        containers.push(Value::Mapping(rendered));
    }

    let pod = mapping_at(doc, template, &["spec", "template", "spec"])?;
    put(pod, "containers", containers);
    if let Some(ref init) = scope.service.init_containers {
        put(pod, "initContainers", init.clone());
    }
    if volume.is_some() {
        let mut claim = Mapping::new();
        put(&mut claim, "claimName", claim_name(name));
        let mut entry = Mapping::new();
        put(&mut entry, "name", storage_name(name));
        put(&mut entry, "persistentVolumeClaim", Value::Mapping(claim));
        put(pod, "volumes", vec![Value::Mapping(entry)]);
    }
    Ok(())
}

fn render_container(
    mut out: Mapping,
    scope: &Scope<'_>,
    volume: Option<&VolumeMapping>,
    warnings: &mut Warnings,
) -> Mapping {
    let container = scope.container;
    put(&mut out, "name", scope.service.name.as_str());
    put(
        &mut out,
        "image",
        resolve_image(container, scope.environment, scope.config),
    );
    put(&mut out, "stdin", true);
    put(&mut out, "tty", true);

    let env: Sequence = resolve_variables(scope, OutputForm::Manifest, warnings)
        .iter()
        .map(|var| {
            let mut entry = Mapping::new();
            put(&mut entry, "name", var.name.as_str());
            put(&mut entry, "value", var.value.as_str());
            Value::Mapping(entry)
        })
        .collect();
    if env.is_empty() {
        out = without(&out, &["env"]);
    } else {
        put(&mut out, "env", env);
    }

    let mut limits = Mapping::new();
    if let Some(memory) = memory_limit(container, scope.config) {
        put(&mut limits, "memory", memory);
    }
    if let Some(ref gpus) = container.gpus {
        put(&mut limits, constants::GPU_RESOURCE_NAME, gpus.as_str());
    }
    if !limits.is_empty() {
        let mut resources = Mapping::new();
        put(&mut resources, "limits", Value::Mapping(limits));
        put(&mut out, "resources", Value::Mapping(resources));
    }

    if let Some(ref entrypoint) = container.entrypoint {
        let (command, args) = split_entrypoint(entrypoint);
        if !command.is_empty() {
            put(&mut out, "command", command);
        }
        if !args.is_empty() {
            put(&mut out, "args", args);
        }
    }
    if let Some(ref probe) = container.liveness_probe {
        put(&mut out, "livenessProbe", probe.clone());
    }
    if let Some(mapping) = volume {
        let mut mount = Mapping::new();
        put(&mut mount, "mountPath", mapping.target.as_str());
        put(&mut mount, "name", storage_name(&scope.service.name));
        put(&mut out, "volumeMounts", vec![Value::Mapping(mount)]);
    }
    out
}

/// Copy of `map` without the given keys, preserving order.
fn without(map: &Mapping, keys: &[&str]) -> Mapping {
    map.iter()
        .filter(|(k, _)| !k.as_str().is_some_and(|k| keys.contains(&k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Splits an entrypoint into the command (first token) and its arguments.
#[must_use]
pub fn split_entrypoint(entrypoint: &str) -> (Vec<String>, Vec<String>) {
    let mut tokens = entrypoint.split_whitespace().map(str::to_string);
    let command = tokens.next().into_iter().collect();
    (command, tokens.collect())
}

fn fill_service(
    doc: &mut Value,
    template: &str,
    scope: &ServiceScope<'_>,
    first: Option<&Container>,
) -> Result<()> {
    let name = scope.service.name.as_str();
    put(
        mapping_at(doc, template, &["metadata"])?,
        "name",
        format!("{name}-service"),
    );
    put(mapping_at(doc, template, &["spec", "selector"])?, "app", name);

    let mappings = first.map(|c| c.port_mappings.as_slice()).unwrap_or_default();
    if mappings.is_empty() {
        return Ok(());
    }
    let ports = sequence_at(doc, template, &["spec", "ports"])?;
    let base = ports
        .first()
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();
    let named = mappings.len() > 1;
    let rendered: Sequence = mappings
        .iter()
        .enumerate()
        .map(|(idx, mapping)| {
            let mut port = without(&base, &["targetPort", "name"]);
            put(&mut port, "port", mapping.target);
            if let Some(source) = mapping.source {
                put(&mut port, "targetPort", source);
            }
            if named {
                put(&mut port, "name", format!("port{idx}"));
            }
            Value::Mapping(port)
        })
        .collect();
    *ports = rendered;
    Ok(())
}

fn fill_ingress(doc: &mut Value, template: &str, service: &str, path: &str, port: u16) -> Result<()> {
    put(
        mapping_at(doc, template, &["metadata"])?,
        "name",
        format!("{service}-ingress"),
    );
    let rule = first_at(doc, template, &["spec", "rules"])?;
    let entry = first_at(rule, template, &["http", "paths"])?;
    put(mapping_at(entry, template, &[])?, "path", path);
    put(
        mapping_at(entry, template, &["backend", "service"])?,
        "name",
        format!("{service}-service"),
    );
    put(
        mapping_at(entry, template, &["backend", "service", "port"])?,
        "number",
        port,
    );
    Ok(())
}

fn render_volume_claim(
    scope: &ServiceScope<'_>,
    templates: &Templates,
    mapping: &VolumeMapping,
) -> Result<String> {
    let restricted = scope
        .config
        .is_restricted_environment(&scope.environment.name);
    let (template, mut claim) = templates.volume_claim(restricted)?;
    put(
        mapping_at(&mut claim, template, &["metadata"])?,
        "name",
        claim_name(&scope.service.name),
    );
    if let Some(ref size) = mapping.size {
        put(
            mapping_at(&mut claim, template, &["spec", "resources", "requests"])?,
            "storage",
            size.as_str(),
        );
    }
    serialize_documents(vec![claim])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;
    use topoc_common::config::CompilerConfig;
    use topoc_model::Topology;

    use super::*;

    const TOPOLOGY: &str = "
kind: EnvironmentDetails
environments:
  - name: dev
    image_registry: registry.dev/apps
    environment_variables:
      - name: FOO
        value: 2
    volume_mappings:
      - service_name: search
        source: /data/old
        target: /old
      - service_name: search
        source: /data/es
        target: /usr/share/elasticsearch/data
        size: 20Gi
  - name: prod-soe
    image_registry: registry.soe/apps
    volume_mappings:
      - service_name: search
        source: /data/es
        target: /usr/share/elasticsearch/data
---
kind: ServiceDetails
services:
  - name: web
    replicas: 3
    ingress_path: /web
    initContainers:
      - name: wait
        image: busybox
        command: \"['sh', '-c', 'sleep 5']\"
    containers:
      - name: registry.example.com/team/web:1.2
        port_mappings:
          - target: 8080
        environment_variables:
          - name: FOO
            value: 1
          - name: WORKERS
            value: 4
        entrypoint: run server --port 8080
        livenessProbe:
          httpGet:
            path: /health
            port: 8080
  - name: search
    containers:
      - name: docker.elastic.co/elasticsearch/elasticsearch:8.11.0
        port_mappings:
          - target: 9200
          - target: 9300
            source: 9301
  - name: ml-inference
    containers:
      - name: inference
        gpus: 1
        environment_variables:
          - name: USE_GPU
            value: true
  - name: portless
    ingress_path: /nothing
    containers:
      - name: batch
  - name: pair
    containers:
      - name: registry.example.com/team/api:1.0
        port_mappings:
          - target: 7000
      - name: team/sidecar:2.0
        port_mappings:
          - target: 7100
";

    struct Fixture {
        topology: Topology,
        config: CompilerConfig,
        proxy_ports: BTreeMap<String, u16>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut config = CompilerConfig::default();
            let _ = config.gpu_services.insert("ml-inference".into());
            Self {
                topology: topoc_model::load(TOPOLOGY).expect("fixture"),
                config,
                proxy_ports: BTreeMap::new(),
            }
        }

        fn render(&self, env: &str, service: &str) -> (RenderedManifest, Warnings) {
            let scope = ServiceScope {
                topology: &self.topology,
                config: &self.config,
                proxy_ports: &self.proxy_ports,
                environment: self.topology.environment(env).expect("environment"),
                service: self.topology.service(service).expect("service"),
            };
            let mut warnings = Warnings::new();
            let manifest =
                render_manifest(&scope, &Templates::embedded(), &mut warnings).expect("render");
            (manifest, warnings)
        }
    }

    fn documents(text: &str) -> Vec<Value> {
        serde_yaml::Deserializer::from_str(text)
            .map(|d| Value::deserialize(d).expect("document"))
            .collect()
    }

    fn by_kind<'a>(docs: &'a [Value], kind: &str) -> &'a Value {
        docs.iter()
            .find(|d| d["kind"] == Value::from(kind))
            .unwrap_or_else(|| panic!("no {kind} document"))
    }

    fn env_value<'a>(container: &'a Value, name: &str) -> Vec<&'a Value> {
        container["env"]
            .as_sequence()
            .expect("env")
            .iter()
            .filter(|e| e["name"] == Value::from(name))
            .map(|e| &e["value"])
            .collect()
    }

    #[test]
    fn deployment_carries_service_identity() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        assert_eq!(manifest.file_name, "k8s-web.yaml");
        let docs = documents(&manifest.contents);
        let deployment = by_kind(&docs, "Deployment");
        assert_eq!(deployment["metadata"]["name"], Value::from("web"));
        assert_eq!(deployment["metadata"]["labels"]["app"], Value::from("web"));
        assert_eq!(
            deployment["spec"]["selector"]["matchLabels"]["app"],
            Value::from("web")
        );
        assert_eq!(deployment["spec"]["replicas"], Value::from(3));
        let container = &deployment["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["name"], Value::from("web"));
        assert_eq!(container["image"], Value::from("registry.dev/apps/web:1.2"));
        assert_eq!(container["stdin"], Value::from(true));
        assert_eq!(container["tty"], Value::from(true));
        assert_eq!(container["livenessProbe"]["httpGet"]["path"], Value::from("/health"));
    }

    #[test]
    fn entrypoint_is_split_into_command_and_args() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        let container = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"][0];
        let command: Vec<String> = serde_yaml::from_value(container["command"].clone()).expect("command");
        let args: Vec<String> = serde_yaml::from_value(container["args"].clone()).expect("args");
        assert_eq!(command, vec!["run"]);
        assert_eq!(args, vec!["server", "--port", "8080"]);
    }

    #[test]
    fn numeric_environment_values_are_strings() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        let container = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(env_value(container, "APP_SERVICE_MAIN_PORT"), vec![&Value::from("8080")]);
        assert_eq!(env_value(container, "WORKERS"), vec![&Value::from("4")]);
        assert!(!manifest.contents.contains("value: 8080\n"));
    }

    #[test]
    fn override_replaces_declared_value() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        let container = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(env_value(container, "FOO"), vec![&Value::from("2")]);
    }

    #[test]
    fn init_containers_pass_through_normalized() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        let init = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["initContainers"][0];
        let command: Vec<String> = serde_yaml::from_value(init["command"].clone()).expect("command");
        assert_eq!(command, vec!["sh", "-c", "sleep 5"]);
    }

    #[test]
    fn single_port_service_is_unnamed() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        let service = by_kind(&docs, "Service");
        assert_eq!(service["metadata"]["name"], Value::from("web-service"));
        assert_eq!(service["spec"]["selector"]["app"], Value::from("web"));
        let ports = service["spec"]["ports"].as_sequence().expect("ports");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0]["port"], Value::from(8080));
        assert!(ports[0].get("name").is_none());
        assert!(ports[0].get("targetPort").is_none());
    }

    #[test]
    fn multiple_ports_are_named_and_targeted() {
        let (manifest, _) = Fixture::new().render("dev", "search");
        let docs = documents(&manifest.contents);
        let ports = by_kind(&docs, "Service")["spec"]["ports"]
            .as_sequence()
            .expect("ports")
            .clone();
        assert_eq!(ports[0]["name"], Value::from("port0"));
        assert_eq!(ports[1]["name"], Value::from("port1"));
        assert_eq!(ports[1]["port"], Value::from(9300));
        assert_eq!(ports[1]["targetPort"], Value::from(9301));
    }

    #[test]
    fn later_containers_start_from_empty_mapping() {
        let (manifest, _) = Fixture::new().render("dev", "pair");
        let docs = documents(&manifest.contents);
        let containers = by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"]
            .as_sequence()
            .expect("containers")
            .clone();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0]["imagePullPolicy"], Value::from("Always"));
        assert!(containers[1].get("imagePullPolicy").is_none());
        assert_eq!(containers[0]["image"], Value::from("registry.dev/apps/api:1.0"));
        assert_eq!(containers[1]["image"], Value::from("registry.dev/apps/sidecar:2.0"));
        for container in &containers {
            assert_eq!(container["name"], Value::from("pair"));
        }

        let ports = by_kind(&docs, "Service")["spec"]["ports"]
            .as_sequence()
            .expect("ports")
            .clone();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0]["port"], Value::from(7000));
    }

    #[test]
    fn ingress_points_at_service_port() {
        let (manifest, _) = Fixture::new().render("dev", "web");
        let docs = documents(&manifest.contents);
        assert_eq!(docs.len(), 3);
        let ingress = by_kind(&docs, "Ingress");
        assert_eq!(ingress["metadata"]["name"], Value::from("web-ingress"));
        let path = &ingress["spec"]["rules"][0]["http"]["paths"][0];
        assert_eq!(path["path"], Value::from("/web"));
        assert_eq!(path["backend"]["service"]["name"], Value::from("web-service"));
        assert_eq!(path["backend"]["service"]["port"]["number"], Value::from(8080));
    }

    #[test]
    fn ingress_without_port_is_dropped_with_warning() {
        let (manifest, warnings) = Fixture::new().render("dev", "portless");
        let docs = documents(&manifest.contents);
        assert!(docs.iter().all(|d| d["kind"] != Value::from("Ingress")));
        assert!(
            warnings
                .as_slice()
                .iter()
                .any(|w| w.kind == WarningKind::IngressWithoutPort)
        );
    }

    #[test]
    fn search_workload_gets_memory_limit_and_volume() {
        let (manifest, warnings) = Fixture::new().render("dev", "search");
        let docs = documents(&manifest.contents);
        let pod = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"];
        let container = &pod["containers"][0];
        assert_eq!(container["resources"]["limits"]["memory"], Value::from("3G"));
        assert_eq!(
            container["volumeMounts"][0]["mountPath"],
            Value::from("/usr/share/elasticsearch/data")
        );
        assert_eq!(container["volumeMounts"][0]["name"], Value::from("search-pv-storage"));
        assert_eq!(
            pod["volumes"][0]["persistentVolumeClaim"]["claimName"],
            Value::from("search-pv-claim")
        );
        assert!(warnings.as_slice().iter().any(|w| w.kind
            == WarningKind::ShadowedVolumeMapping {
                target: "/old".into()
            }));
    }

    #[test]
    fn volume_claim_uses_size_and_environment_variant() {
        let fixture = Fixture::new();
        let (dev, _) = fixture.render("dev", "search");
        let (file, text) = dev.volume_claim.expect("claim");
        assert_eq!(file, "k8s-search-pv-claim.yaml");
        let claim: Value = serde_yaml::from_str(&text).expect("claim yaml");
        assert_eq!(claim["metadata"]["name"], Value::from("search-pv-claim"));
        assert_eq!(claim["spec"]["resources"]["requests"]["storage"], Value::from("20Gi"));
        assert!(claim["spec"].get("storageClassName").is_none());

        let (soe, _) = fixture.render("prod-soe", "search");
        let (_, text) = soe.volume_claim.expect("claim");
        let claim: Value = serde_yaml::from_str(&text).expect("claim yaml");
        assert!(claim["spec"].get("storageClassName").is_some());
        assert_eq!(claim["spec"]["resources"]["requests"]["storage"], Value::from("1Gi"));
    }

    #[test]
    fn gpu_limit_kept_while_use_gpu_follows_manifest_check() {
        let mut fixture = Fixture::new();
        let (manifest, _) = fixture.render("prod-soe", "ml-inference");
        let docs = documents(&manifest.contents);
        let container = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["resources"]["limits"]["nvidia.com/gpu"], Value::from("1"));
        assert!(env_value(container, "USE_GPU").is_empty());

        fixture.config.restricted_environment = "airgap".into();
        let (manifest, _) = fixture.render("prod-soe", "ml-inference");
        let docs = documents(&manifest.contents);
        let container = &by_kind(&docs, "Deployment")["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(env_value(container, "USE_GPU"), vec![&Value::from("true")]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let fixture = Fixture::new();
        let (first, _) = fixture.render("dev", "web");
        let (second, _) = fixture.render("dev", "web");
        assert_eq!(first, second);
    }

    #[test]
    fn split_entrypoint_single_token() {
        let (command, args) = split_entrypoint("  nginx  ");
        assert_eq!(command, vec!["nginx"]);
        assert!(args.is_empty());
    }
}
