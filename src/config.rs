use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use toml_edit::{value, Array, DocumentMut};

trait ConfigSerializeDefault {
    fn fix_config(self, name: &str, doc: &mut DocumentMut);
}

macro_rules! impl_simple_default {
    ( $( $type:ty ),* ) => {
        $(
            impl ConfigSerializeDefault for $type {
                fn fix_config(self, name: &str, doc: &mut DocumentMut) {
                    doc.entry(name).or_insert_with(|| value(self));
                }
            }
        )*
    }
}

impl_simple_default!(String, bool);

impl ConfigSerializeDefault for Vec<String> {
    fn fix_config(self, name: &str, doc: &mut DocumentMut) {
        doc.entry(name).or_insert_with(|| {
            let mut array = Array::new();
            for item in self {
                array.push(item);
            }
            value(array)
        });
    }
}

macro_rules! gen_config {
    (
        $( $(#[doc = $doc:literal])* $name:ident: $type:ty = $default:expr),*
    ) => {
        #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
        pub struct GcConfig {
            $(
                $(#[doc = $doc])*
                pub $name: $type,
            )*
        }

        impl GcConfig {
            /// Reads the config file, writing back any key that is missing with its default value.
            pub fn load(config_file: &Path) -> Result<GcConfig> {
                let str = fs::read_to_string(config_file).unwrap_or_default();
                let mut doc = str
                    .parse::<DocumentMut>()
                    .with_context(|| format!("could not parse {}", config_file.display()))?;

                $(
                    <$type as ConfigSerializeDefault>::fix_config($default, stringify!($name), &mut doc);
                )*

                let patched = doc.to_string();
                if str != patched {
                    fs::write(config_file, &patched)
                        .with_context(|| format!("could not write {}", config_file.display()))?;
                }

                toml::from_str(&patched)
                    .with_context(|| format!("invalid config in {}", config_file.display()))
            }
        }
    };
}

gen_config! {
    /// Directory of the daily rolling log file.
    log_dir: String = "./logs".to_string(),
    /// Flags used when none are given on the command line, e.g. `--dry-run --report`.
    gc_flags: String = String::new(),
    /// Types whose nodes are always kept, on top of the bundled ones.
    entrypoint_types: Vec<String> = Vec::new(),
    /// Where the report is written when running with `--report`.
    report_path: String = "gc_report.json".to_string(),
    /// Whether nodes without a parent are always kept.
    keep_roots: bool = true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_are_written_back() {
        let dir = std::env::temp_dir().join(format!("scenegc-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenegc.toml");
        fs::write(&path, "gc_flags = \"-n\"\nentrypoint_types = [\"VRCStation\"]\n").unwrap();

        let config = GcConfig::load(&path).unwrap();
        assert_eq!(config.gc_flags, "-n");
        assert_eq!(config.entrypoint_types, ["VRCStation"]);
        assert_eq!(config.log_dir, "./logs");
        assert!(config.keep_roots);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("report_path = \"gc_report.json\""));
        assert_eq!(GcConfig::load(&path).unwrap(), config);

        fs::remove_dir_all(&dir).unwrap();
    }
}
