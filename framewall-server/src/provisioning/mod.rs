//! Dashboard-stack provisioning artifacts.
//!
//! The external dashboard stack picks up three files at startup: a
//! datasource YAML, a server INI, and the dashboard JSON itself. The first
//! two are produced by line-based substitution over shipped templates so
//! the templates stay valid, reviewable config files. The generators take
//! `BufRead`/`Write` pairs; the path wrappers at the bottom do the file IO.

use std::{
    fs,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DatasourceCredentials, DatasourceTlsMaterial, ProvisioningConfig};
use framewall_core::dashboard::Dashboard;

/// Errors raised while generating provisioning artifacts.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("provisioning io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize dashboard: {0}")]
    Dashboard(#[from] serde_json::Error),
}

impl ProvisioningError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Collapse a PEM document to a single line, joining trimmed lines with a
/// literal `\n` sequence. The datasource consumer only accepts certificates
/// in this one-line form.
pub fn flatten_pem(pem: &str) -> String {
    pem.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\\n")
}

/// Fill the datasource template.
///
/// Credentials replace the `""` placeholders on the `user:`, `password:`
/// and `database:` lines in both modes. When TLS material is present the
/// production substitutions also apply: `tlsAuth`/`tlsAuthWithCACert` flip
/// from `false` to `true`, the `"..."` placeholders receive the flattened
/// PEM documents, and the `url:` line is upgraded from `http://` to
/// `https://`.
pub fn generate_datasource<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    creds: &DatasourceCredentials,
    tls: Option<&DatasourceTlsMaterial>,
) -> Result<(), std::io::Error> {
    let cred_fields = [
        ("user:", creds.user.as_str()),
        ("password:", creds.password.as_str()),
        ("database:", creds.database.as_str()),
    ];
    let flattened = tls.map(|tls| {
        [
            ("tlsCACert:", flatten_pem(&tls.ca_pem)),
            ("tlsClientCert:", flatten_pem(&tls.cert_pem)),
            ("tlsClientKey:", flatten_pem(&tls.key_pem)),
        ]
    });

    for line in reader.lines() {
        let mut line = line?;

        for (tag, value) in &cred_fields {
            if line.contains(tag) {
                line = line.replace("\"\"", value);
            }
        }

        if let Some(flattened) = &flattened {
            if line.contains("tlsAuth:") || line.contains("tlsAuthWithCACert:") {
                line = line.replace("false", "true");
            }
            for (tag, value) in flattened {
                if line.contains(tag) {
                    line = line.replace("\"...\"", &format!("\"{value}\""));
                }
            }
            if line.contains("url:") {
                line = line.replace("http://", "https://");
            }
        }

        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Which INI substitutions to apply.
#[derive(Debug, Clone)]
pub enum IniMode {
    /// Uncomment `;http_addr =` only; the stack serves plain HTTP.
    Dev,
    /// Additionally uncomment `;protocol = http` to `https` and point
    /// `;cert_file =` / `;cert_key =` at the installed PEM files.
    Prod {
        cert_file: PathBuf,
        key_file: PathBuf,
    },
}

/// Fill the server INI template. `http_addr` is substituted in both modes.
pub fn generate_ini<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    mode: &IniMode,
    http_addr: &str,
) -> Result<(), std::io::Error> {
    for line in reader.lines() {
        let mut line = line?;

        if line.contains(";http_addr =") {
            line = line.replace(";http_addr =", &format!("http_addr = {http_addr}"));
        } else if let IniMode::Prod {
            cert_file,
            key_file,
        } = mode
        {
            if line.contains(";protocol = http") {
                line = line.replace(";protocol = http", "protocol = https");
            } else if line.contains(";cert_file =") {
                line = line.replace(
                    ";cert_file =",
                    &format!("cert_file = {}", cert_file.display()),
                );
            } else if line.contains(";cert_key =") {
                line = line.replace(
                    ";cert_key =",
                    &format!("cert_key = {}", key_file.display()),
                );
            }
        }

        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Copy the static provisioning assets (dashboard locator YAML and friends)
/// into the install directory. Subdirectories are skipped.
pub fn copy_assets(src_dir: &Path, dst_dir: &Path) -> Result<usize, ProvisioningError> {
    fs::create_dir_all(dst_dir).map_err(|e| ProvisioningError::io(dst_dir, e))?;

    let mut copied = 0;
    let entries = fs::read_dir(src_dir).map_err(|e| ProvisioningError::io(src_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ProvisioningError::io(src_dir, e))?;
        let src = entry.path();
        if !src.is_file() {
            continue;
        }
        let dst = dst_dir.join(entry.file_name());
        fs::copy(&src, &dst).map_err(|e| ProvisioningError::io(&src, e))?;
        debug!(src = %src.display(), dst = %dst.display(), "copied provisioning asset");
        copied += 1;
    }
    Ok(copied)
}

/// Serialize the generated dashboard to `path`, creating parent directories.
pub fn write_dashboard(dashboard: &Dashboard, path: &Path) -> Result<(), ProvisioningError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ProvisioningError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(dashboard)?;
    fs::write(path, json).map_err(|e| ProvisioningError::io(path, e))?;
    info!(path = %path.display(), "wrote generated dashboard");
    Ok(())
}

/// Run the datasource and INI generators plus the asset copy against the
/// configured template and output paths.
pub fn run(
    config: &ProvisioningConfig,
    ini_mode: &IniMode,
    http_addr: &str,
) -> Result<(), ProvisioningError> {
    let template = fs::File::open(&config.datasource_template)
        .map_err(|e| ProvisioningError::io(&config.datasource_template, e))?;
    if let Some(parent) = config.datasource_output.parent() {
        fs::create_dir_all(parent).map_err(|e| ProvisioningError::io(parent, e))?;
    }
    let output = fs::File::create(&config.datasource_output)
        .map_err(|e| ProvisioningError::io(&config.datasource_output, e))?;
    generate_datasource(
        BufReader::new(template),
        output,
        &config.datasource,
        config.datasource_tls.as_ref(),
    )
    .map_err(|e| ProvisioningError::io(&config.datasource_output, e))?;
    info!(path = %config.datasource_output.display(), "wrote datasource config");

    let template = fs::File::open(&config.ini_template)
        .map_err(|e| ProvisioningError::io(&config.ini_template, e))?;
    if let Some(parent) = config.ini_output.parent() {
        fs::create_dir_all(parent).map_err(|e| ProvisioningError::io(parent, e))?;
    }
    let output = fs::File::create(&config.ini_output)
        .map_err(|e| ProvisioningError::io(&config.ini_output, e))?;
    generate_ini(BufReader::new(template), output, ini_mode, http_addr)
        .map_err(|e| ProvisioningError::io(&config.ini_output, e))?;
    info!(path = %config.ini_output.display(), "wrote server ini");

    if let (Some(src), Some(dst)) = (&config.assets_dir, &config.assets_output) {
        let copied = copy_assets(src, dst)?;
        info!(copied, dst = %dst.display(), "copied provisioning assets");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASOURCE_SAMPLE: &str = r#"apiVersion: 1
datasources:
  - name: timeseries
    type: influxdb
    url: http://$INFLUX_SERVER:8086
    user: ""
    password: ""
    database: ""
    jsonData:
      tlsAuth: false
      tlsAuthWithCACert: false
    secureJsonData:
      tlsCACert: "..."
      tlsClientCert: "..."
      tlsClientKey: "..."
"#;

    const INI_SAMPLE: &str = r#"[server]
;protocol = http
;http_addr =
;cert_file =
;cert_key =
"#;

    fn creds() -> DatasourceCredentials {
        DatasourceCredentials {
            user: "admin".into(),
            password: "secret".into(),
            database: "frames".into(),
        }
    }

    fn render_datasource(tls: Option<&DatasourceTlsMaterial>) -> String {
        let mut out = Vec::new();
        generate_datasource(DATASOURCE_SAMPLE.as_bytes(), &mut out, &creds(), tls).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn flatten_pem_joins_trimmed_lines() {
        let pem = "-----BEGIN CERTIFICATE-----\n  abc  \ndef\n-----END CERTIFICATE-----\n";
        assert_eq!(
            flatten_pem(pem),
            "-----BEGIN CERTIFICATE-----\\nabc\\ndef\\n-----END CERTIFICATE-----"
        );
    }

    #[test]
    fn dev_datasource_fills_credentials_only() {
        let out = render_datasource(None);
        assert!(out.contains("user: \"admin\"") || out.contains("user: admin"));
        assert!(out.contains("secret"));
        assert!(out.contains("database: \"frames\"") || out.contains("database: frames"));
        // Untouched in dev mode.
        assert!(out.contains("url: http://$INFLUX_SERVER:8086"));
        assert!(out.contains("tlsAuth: false"));
        assert!(out.contains("tlsCACert: \"...\""));
    }

    #[test]
    fn prod_datasource_enables_tls_and_upgrades_url() {
        let tls = DatasourceTlsMaterial {
            ca_pem: "CA1\nCA2".into(),
            cert_pem: "CERT".into(),
            key_pem: "KEY".into(),
        };
        let out = render_datasource(Some(&tls));
        assert!(out.contains("url: https://$INFLUX_SERVER:8086"));
        assert!(out.contains("tlsAuth: true"));
        assert!(out.contains("tlsAuthWithCACert: true"));
        assert!(out.contains("tlsCACert: \"CA1\\nCA2\""));
        assert!(out.contains("tlsClientCert: \"CERT\""));
        assert!(out.contains("tlsClientKey: \"KEY\""));
    }

    #[test]
    fn dev_ini_uncomments_bind_host_only() {
        let mut out = Vec::new();
        generate_ini(INI_SAMPLE.as_bytes(), &mut out, &IniMode::Dev, "0.0.0.0").unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("http_addr = 0.0.0.0"));
        assert!(out.contains(";protocol = http"));
        assert!(out.contains(";cert_file ="));
        assert!(out.contains(";cert_key ="));
    }

    #[test]
    fn prod_ini_enables_https_and_certificates() {
        let mode = IniMode::Prod {
            cert_file: PathBuf::from("/etc/framewall/server_cert.pem"),
            key_file: PathBuf::from("/etc/framewall/server_key.pem"),
        };
        let mut out = Vec::new();
        generate_ini(INI_SAMPLE.as_bytes(), &mut out, &mode, "10.0.0.5").unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("protocol = https"));
        assert!(out.contains("http_addr = 10.0.0.5"));
        assert!(out.contains("cert_file = /etc/framewall/server_cert.pem"));
        assert!(out.contains("cert_key = /etc/framewall/server_key.pem"));
        assert!(!out.contains(";protocol"));
    }

    #[test]
    fn copy_assets_copies_top_level_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("dashboard.yml"), "apiVersion: 1\n").unwrap();
        fs::write(src.path().join("dashboard.json"), "{}\n").unwrap();
        fs::create_dir(src.path().join("nested")).unwrap();

        let copied = copy_assets(src.path(), dst.path()).unwrap();
        assert_eq!(copied, 2);
        assert!(dst.path().join("dashboard.yml").is_file());
        assert!(dst.path().join("dashboard.json").is_file());
    }
}
