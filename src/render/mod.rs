use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tera::{Context, Tera};

use crate::error::OpsError;
use crate::snooping::SnoopCandidate;
use crate::utils;

/// Files written and per-device failures of one render pass
#[derive(Debug, Default)]
pub struct RenderOutcome {
    pub written: IndexMap<String, PathBuf>,
    pub failures: Vec<(String, OpsError)>,
}

/// ConfigRenderer turns snooping candidates into per-device config files.
/// Templates are loaded from `templates_dir` on first use.
pub struct ConfigRenderer {
    tera: Tera,
    templates_dir: PathBuf,
    output_dir: PathBuf,
}

impl ConfigRenderer {
    pub fn new(templates_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            tera: Tera::default(),
            templates_dir: templates_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Path of a device's config file
    pub fn config_path(&self, device: &str) -> PathBuf {
        config_path(&self.output_dir, device)
    }

    fn ensure_template(&mut self, device: &str, template: &str) -> Result<(), OpsError> {
        if self.tera.get_template_names().any(|name| name == template) {
            return Ok(());
        }
        let path = self.templates_dir.join(template);
        if !path.is_file() {
            return Err(OpsError::render(
                device,
                format!("template not found: {}", path.display()),
            ));
        }
        self.tera
            .add_template_file(&path, Some(template))
            .map_err(|e| OpsError::render(device, format!("invalid template {}: {}", template, e)))
    }

    /// Render one device's configuration text
    pub fn render(
        &mut self,
        device: &str,
        template: &str,
        candidate: &SnoopCandidate,
    ) -> Result<String, OpsError> {
        self.ensure_template(device, template)?;

        let mut context = Context::new();
        context.insert("hostname", device);
        context.insert("my_dict", candidate);

        self.tera
            .render(template, &context)
            .map_err(|e| OpsError::render(device, render_error_chain(&e)))
    }

    /// Render and write one device's config file
    pub fn render_to_file(
        &mut self,
        device: &str,
        template: &str,
        candidate: &SnoopCandidate,
    ) -> Result<PathBuf, OpsError> {
        if !utils::is_valid_hostname(device) {
            return Err(OpsError::render(device, "device name is not a valid file name"));
        }
        let text = self.render(device, template, candidate)?;
        let path = self.config_path(device);
        utils::write_atomic(&path, &text)?;
        Ok(path)
    }

    /// Render every device independently. A failure is recorded against its
    /// device and the remaining devices are still rendered.
    pub fn render_all(
        &mut self,
        template: &str,
        candidates: &IndexMap<String, SnoopCandidate>,
    ) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();

        for (device, candidate) in candidates {
            match self.render_to_file(device, template, candidate) {
                Ok(path) => {
                    tracing::debug!("Wrote {}", path.display());
                    outcome.written.insert(device.clone(), path);
                }
                Err(e) => {
                    tracing::warn!("Config generation failed for {}: {}", device, e);
                    outcome.failures.push((device.clone(), e));
                }
            }
        }

        outcome
    }
}

/// `<output_dir>/<device>.cfg`
pub fn config_path(output_dir: &Path, device: &str) -> PathBuf {
    output_dir.join(format!("{}.cfg", device))
}

/// Tera nests the useful message in the error's source chain
fn render_error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNOOP_TEMPLATE: &str = include_str!("../../templates/dhcp_snooping.j2");

    fn renderer_with(name: &str, content: &str) -> (tempfile::TempDir, ConfigRenderer) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), content).unwrap();
        let renderer = ConfigRenderer::new(dir.path(), dir.path().join("out"));
        (dir, renderer)
    }

    fn candidate() -> SnoopCandidate {
        let mut c = SnoopCandidate::default();
        c.interfaces.insert("GigabitEthernet1/0/1".into());
        c.interfaces.insert("GigabitEthernet1/0/2".into());
        c.port_channels.insert(
            "Port-channel1".into(),
            vec!["GigabitEthernet1/0/1".into(), "GigabitEthernet1/0/2".into()],
        );
        c.vlans = vec!["1".into(), "10".into()];
        c
    }

    #[test]
    fn test_render_snooping_template() {
        let (_dir, mut renderer) = renderer_with("dhcp_snooping.j2", SNOOP_TEMPLATE);

        let text = renderer.render("hq-swn-01", "dhcp_snooping.j2", &candidate()).unwrap();
        assert!(text.contains("ip dhcp snooping vlan 1,10\n"));
        assert!(text.contains("interface GigabitEthernet1/0/1\n ip dhcp snooping trust\n"));
        assert!(text.contains("interface GigabitEthernet1/0/2\n ip dhcp snooping trust\n"));
        assert!(text.contains("interface Port-channel1\n ip dhcp snooping trust\n"));
        assert!(text.lines().all(|line| !line.trim_start().starts_with("{%")));
    }

    #[test]
    fn test_render_without_vlans_omits_vlan_line() {
        let (_dir, mut renderer) = renderer_with("dhcp_snooping.j2", SNOOP_TEMPLATE);

        let text = renderer
            .render("hq-swn-01", "dhcp_snooping.j2", &SnoopCandidate::default())
            .unwrap();
        assert!(!text.contains("snooping vlan"));
        assert!(!text.contains("interface "));
    }

    #[test]
    fn test_template_loaded_from_directory() {
        let templates = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(
            templates.path().join("vlans.j2"),
            "{% for v in my_dict.vlans %}vlan {{ v }}\n{% endfor %}",
        )
        .unwrap();

        let mut renderer = ConfigRenderer::new(templates.path(), output.path());
        let path = renderer.render_to_file("hq-swn-01", "vlans.j2", &candidate()).unwrap();

        assert_eq!(path, output.path().join("hq-swn-01.cfg"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "vlan 1\nvlan 10\n");
    }

    #[test]
    fn test_render_all_isolates_failures() {
        let (dir, mut renderer) = renderer_with("t.j2", "hostname {{ hostname }}\n");
        let output = dir.path().join("out");

        let mut candidates = IndexMap::new();
        candidates.insert("hq-swn-01".to_string(), candidate());
        candidates.insert("../escape".to_string(), candidate());
        candidates.insert("hq-swn-02".to_string(), SnoopCandidate::default());

        let outcome = renderer.render_all("t.j2", &candidates);
        assert_eq!(outcome.written.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "../escape");
        assert!(output.join("hq-swn-02.cfg").exists());
        assert!(!dir.path().join("escape.cfg").exists());
    }

    #[test]
    fn test_missing_template_fails_each_device() {
        let templates = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut renderer = ConfigRenderer::new(templates.path(), output.path());

        let mut candidates = IndexMap::new();
        candidates.insert("a-swn-01".to_string(), candidate());
        candidates.insert("b-swn-01".to_string(), candidate());

        let outcome = renderer.render_all("absent.j2", &candidates);
        assert!(outcome.written.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(matches!(outcome.failures[0].1, OpsError::Render { .. }));
    }
}
