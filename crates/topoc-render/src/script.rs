//! Container-launch scripts and the image pull list.

use topoc_common::warning::Warnings;
use topoc_model::{Container, Service};
use topoc_resolve::image::resolve_image;
use topoc_resolve::memory::memory_limit;
use topoc_resolve::{OutputForm, Scope, resolve_variables};

const CONTINUATION: &str = " \\\n";

/// A rendered launch script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchScript {
    /// File name inside the environment directory.
    pub file_name: String,
    /// Script text.
    pub contents: String,
    /// Image reference the script launches.
    pub image: String,
}

/// File name of the launch script for `container` of `service`.
///
/// Services with several containers get the container name as a suffix,
/// with path and tag separators replaced.
#[must_use]
pub fn script_file_name(service: &Service, container: &Container) -> String {
    let suffix = if service.has_multiple_containers() {
        container.name.replace(['/', ':'], "_")
    } else {
        String::new()
    };
    format!("run_{}{suffix}.sh", service.name)
}

/// Renders the launch script for the container in `scope`.
///
/// Line order: name and restart flags, ports, GPU flag, variables,
/// memory limit, volumes, entrypoint, image.
pub fn render_launch_script(scope: &Scope<'_>, warnings: &mut Warnings) -> LaunchScript {
    let container = scope.container;
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str("  ");
        out.push_str(&text);
        out.push_str(CONTINUATION);
    };

    line("--restart always -dit".to_string());
    for mapping in &container.port_mappings {
        line(format!("-p {}:{}", mapping.target, mapping.source_or_target()));
    }
    if let Some(ref gpus) = container.gpus {
        if scope.gpu_excluded(OutputForm::Script) {
            tracing::debug!(service = %scope.service.name, "omitting --gpus flag");
        } else {
            line(format!("--gpus {gpus}"));
        }
    }
    for var in &resolve_variables(scope, OutputForm::Script, warnings) {
        line(format!("-e {}={}", var.name, var.value));
    }
    if let Some(limit) = memory_limit(container, scope.config) {
        line(format!("-m {limit}"));
    }
    for volume in scope.environment.volumes_for(&scope.service.name) {
        line(format!("-v {}:{}", volume.source, volume.target));
    }
    if let Some(ref entrypoint) = container.entrypoint {
        line(format!("--entrypoint {entrypoint}"));
    }

    let image = resolve_image(container, scope.environment, scope.config);
    let contents = format!(
        "docker run --name {}{CONTINUATION}{out}  {image}",
        scope.service.name
    );
    LaunchScript {
        file_name: script_file_name(scope.service, container),
        contents,
        image,
    }
}

/// Deduplicated list of images to pull for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullList {
    images: Vec<String>,
}

impl PullList {
    /// Creates an empty pull list.
    #[must_use]
    pub const fn new() -> Self {
        Self { images: Vec::new() }
    }

    /// Adds an image unless already listed. Returns `true` if added.
    pub fn add(&mut self, image: &str) -> bool {
        if self.images.iter().any(|i| i == image) {
            return false;
        }
        self.images.push(image.to_string());
        true
    }

    /// Renders one `docker pull` line per image.
    #[must_use]
    pub fn render(&self) -> String {
        self.images
            .iter()
            .map(|image| format!("docker pull {image}\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

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
        source: /data/es
        target: /usr/share/elasticsearch/data
  - name: prod-soe
    image_registry: registry.soe/apps
---
kind: ServiceDetails
services:
  - name: web
    containers:
      - name: registry.example.com/team/web:1.2
        port_mappings:
          - target: 8080
        environment_variables:
          - name: FOO
            value: 1
        entrypoint: run server --port 8080
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
        gpus: all
        environment_variables:
          - name: USE_GPU
            value: true
  - name: pair
    containers:
      - name: team/front
      - name: team/back:2
";

    fn render(env: &str, service: &str, container: usize) -> (LaunchScript, Warnings) {
        let topology: Topology = topoc_model::load(TOPOLOGY).expect("fixture");
        let mut config = CompilerConfig::default();
        let _ = config.gpu_services.insert("ml-inference".into());
        let proxy_ports = BTreeMap::new();
        let service = topology.service(service).expect("service");
        let scope = Scope {
            topology: &topology,
            config: &config,
            proxy_ports: &proxy_ports,
            environment: topology.environment(env).expect("environment"),
            service,
            container: &service.containers[container],
        };
        let mut warnings = Warnings::new();
        let script = render_launch_script(&scope, &mut warnings);
        (script, warnings)
    }

    #[test]
    fn renders_full_script_in_fixed_order() {
        let (script, _) = render("dev", "web", 0);
        let expected = "docker run --name web \\
  --restart always -dit \\
  -p 8080:8080 \\
  -e APP_ENVIRONMENT_NAME=dev \\
  -e APP_SERVICE_NAME=web \\
  -e APP_SERVICE_MAIN_PORT=8080 \\
  -e FOO=1 \\
  -e FOO=2 \\
  --entrypoint run server --port 8080 \\
  registry.dev/apps/web:1.2";
        assert_eq!(script.contents, expected);
        assert_eq!(script.file_name, "run_web.sh");
        assert_eq!(script.image, "registry.dev/apps/web:1.2");
    }

    #[test]
    fn source_port_and_search_defaults() {
        let (script, _) = render("dev", "search", 0);
        assert!(script.contents.contains("  -p 9300:9301 \\\n"));
        assert!(script.contents.contains("  -m 3G \\\n"));
        assert!(
            script
                .contents
                .contains("  -v /data/es:/usr/share/elasticsearch/data \\\n")
        );
    }

    #[test]
    fn gpu_settings_withheld_in_non_gpu_environment() {
        let (script, _) = render("prod-soe", "ml-inference", 0);
        assert!(!script.contents.contains("--gpus"));
        assert!(!script.contents.contains("USE_GPU"));

        let (script, _) = render("dev", "ml-inference", 0);
        assert!(script.contents.contains("  --gpus all \\\n"));
        assert!(script.contents.contains("  -e USE_GPU=true \\\n"));
    }

    #[test]
    fn multi_container_scripts_are_suffixed() {
        let (front, _) = render("dev", "pair", 0);
        let (back, _) = render("dev", "pair", 1);
        assert_eq!(front.file_name, "run_pairteam_front.sh");
        assert_eq!(back.file_name, "run_pairteam_back_2.sh");
    }

    #[test]
    fn pull_list_deduplicates_in_order() {
        let mut pulls = PullList::new();
        assert!(pulls.add("registry.dev/apps/web:1.2"));
        assert!(pulls.add("registry.dev/apps/api"));
        assert!(!pulls.add("registry.dev/apps/web:1.2"));
        assert_eq!(
            pulls.render(),
            "docker pull registry.dev/apps/web:1.2\ndocker pull registry.dev/apps/api\n"
        );
    }
}
