//! Image reference resolution.

use topoc_common::config::CompilerConfig;
use topoc_model::{Container, Environment};

/// Fully qualified image reference of `container` in `environment`.
///
/// Containers flagged to keep their registry use the declared reference
/// everywhere except in the network-isolated environment. Every other
/// case rewrites the reference onto the environment's registry, dropping
/// any registry path already present.
#[must_use]
pub fn resolve_image(
    container: &Container,
    environment: &Environment,
    config: &CompilerConfig,
) -> String {
    if container.omit_registry_for_restricted_environments
        && !config.is_restricted_environment(&environment.name)
    {
        return container.name.clone();
    }
    join_registry(&environment.image_registry, basename(&container.name))
}

/// Last path segment of an image reference.
///
/// `registry.example.com/team/web:1.2` becomes `web:1.2`.
#[must_use]
pub fn basename(image: &str) -> &str {
    image.rsplit('/').next().unwrap_or(image)
}

fn join_registry(registry: &str, image: &str) -> String {
    if registry.is_empty() {
        image.to_string()
    } else if registry.ends_with('/') {
        format!("{registry}{image}")
    } else {
        format!("{registry}/{image}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(name: &str, registry: &str) -> Environment {
        serde_yaml::from_str(&format!("name: {name}\nimage_registry: {registry}\n"))
            .expect("environment")
    }

    fn container(yaml: &str) -> Container {
        serde_yaml::from_str(yaml).expect("container")
    }

    #[test]
    fn registry_path_is_replaced() {
        let c = container("name: registry.example.com/team/web:1.2");
        let env = environment("dev", "registry.dev/apps");
        assert_eq!(
            resolve_image(&c, &env, &CompilerConfig::default()),
            "registry.dev/apps/web:1.2"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let c = container("name: web");
        let env = environment("dev", "registry.dev/apps/");
        assert_eq!(
            resolve_image(&c, &env, &CompilerConfig::default()),
            "registry.dev/apps/web"
        );
    }

    #[test]
    fn omission_flag_keeps_declared_reference_outside_restricted() {
        let c = container(
            "name: docker.io/library/redis:7\nomit_image_registry_for_non_internet_environments: true",
        );
        let config = CompilerConfig::default();
        let dev = environment("dev", "registry.dev/apps");
        let soe = environment("prod-soe", "registry.soe/mirror");
        assert_eq!(resolve_image(&c, &dev, &config), "docker.io/library/redis:7");
        assert_eq!(resolve_image(&c, &soe, &config), "registry.soe/mirror/redis:7");
    }

    #[test]
    fn basename_without_separator_is_identity() {
        assert_eq!(basename("nginx"), "nginx");
    }
}
