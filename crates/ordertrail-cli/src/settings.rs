//! Runtime configuration, layered from a TOML file and the environment.
//!
//! Environment variables use the `ORDERTRAIL_` prefix and `__` to reach
//! nested keys, e.g. `ORDERTRAIL_UPSTREAM__ACCESS_TOKEN`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use ordertrail_core::{fields::FieldCatalog, store::DEFAULT_HISTORY_PREFIX};
use serde::Deserialize;

pub const DEFAULT_ORDERS_URL: &str = "https://owner-api.teslamotors.com/api/1/users/orders";
pub const DEFAULT_DETAILS_URL_TEMPLATE: &str = "https://akamai-apigateway-vfx.tesla.com/tasks?deviceLanguage=en&deviceCountry=US&referenceNumber={ORDER_ID}&appVersion=9.99.9-9999";

/// Placeholder in [`UpstreamConfig::details_url_template`].
pub const ORDER_ID_PLACEHOLDER: &str = "{ORDER_ID}";

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite file holding the histories; a leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  #[serde(default = "default_history_prefix")]
  pub history_prefix: String,
  #[serde(default)]
  pub upstream:       UpstreamConfig,
  #[serde(default)]
  pub server:         ServerConfig,
  /// Overrides the built-in catalog of interesting fields.
  #[serde(default)]
  pub fields:         Option<FieldCatalog>,
}

/// Where and how order data is fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  #[serde(default = "default_orders_url")]
  pub orders_url:           String,
  #[serde(default = "default_details_url_template")]
  pub details_url_template: String,
  #[serde(default)]
  pub access_token:         Option<String>,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      orders_url:           default_orders_url(),
      details_url_template: default_details_url_template(),
      access_token:         None,
    }
  }
}

/// Bind address for `ordertrail serve`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

impl Default for ServerConfig {
  fn default() -> Self { Self { host: default_host(), port: default_port() } }
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/ordertrail/history.db") }
fn default_history_prefix() -> String { DEFAULT_HISTORY_PREFIX.to_owned() }
fn default_orders_url() -> String { DEFAULT_ORDERS_URL.to_owned() }
fn default_details_url_template() -> String { DEFAULT_DETAILS_URL_TEMPLATE.to_owned() }
fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 5240 }

impl Settings {
  /// Read `path` (if it exists) and then the `ORDERTRAIL_*` environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::load_from(
      Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
          Environment::with_prefix("ORDERTRAIL")
            .prefix_separator("_")
            .separator("__"),
        ),
    )
  }

  fn load_from(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
    let mut settings: Self = builder
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise configuration")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }

  /// The configured field catalog, or the built-in one.
  pub fn catalog(&self) -> FieldCatalog { self.fields.clone().unwrap_or_default() }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(s: &str) -> Settings {
    Settings::load_from(Config::builder().add_source(File::from_str(s, FileFormat::Toml)))
      .unwrap()
  }

  #[test]
  fn defaults_apply_to_an_empty_file() {
    let s = from_toml("");
    assert_eq!(s.history_prefix, "order-history-");
    assert_eq!(s.server.port, 5240);
    assert_eq!(s.upstream.orders_url, DEFAULT_ORDERS_URL);
    assert!(s.upstream.details_url_template.contains(ORDER_ID_PLACEHOLDER));
    assert!(s.upstream.access_token.is_none());
    assert_eq!(s.catalog().len(), 14);
  }

  #[test]
  fn file_values_override_defaults() {
    let s = from_toml(
      r#"
        store_path     = "/tmp/orders.db"
        history_prefix = "h-"

        [upstream]
        orders_url   = "http://localhost:9000/orders"
        access_token = "abc"

        [server]
        port = 8080

        [[fields]]
        path  = "order.orderStatus"
        label = "Status"
      "#,
    );
    assert_eq!(s.store_path, PathBuf::from("/tmp/orders.db"));
    assert_eq!(s.history_prefix, "h-");
    assert_eq!(s.upstream.orders_url, "http://localhost:9000/orders");
    assert_eq!(s.upstream.details_url_template, DEFAULT_DETAILS_URL_TEMPLATE);
    assert_eq!(s.upstream.access_token.as_deref(), Some("abc"));
    assert_eq!(s.server.host, "127.0.0.1");
    assert_eq!(s.server.port, 8080);

    let catalog = s.catalog();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.label("order.orderStatus"), "Status");
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let s = Settings::load_from(
      Config::builder().add_source(File::from(Path::new("/nonexistent/ordertrail.toml")).required(false)),
    )
    .unwrap();
    assert_eq!(s.server.port, 5240);
  }
}
