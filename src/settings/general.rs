//! General settings: host, security, proxy, logging, analytics, updates and
//! backup. All seven live in Lidarr's single host config resource.

use super::Invalid;
use reconcile::codec::{Codec, Fields, RemoteEnum, enum_codec, mask_secret};
use reconcile::{
    ApiClient, ApplyContext, Declared, Endpoint, FieldMapping, Orchestrator, Resolver,
    SettingsGroup, decode_into,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

pub const HOST_CONFIG: &str = "/api/v1/config/host";

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationMethod {
    #[default]
    None,
    /// HTTP basic auth (browser popup)
    Basic,
    /// Login page
    Form,
}

impl RemoteEnum for AuthenticationMethod {
    const ALL: &'static [Self] = &[Self::None, Self::Basic, Self::Form];

    fn remote_value(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Form => "forms",
        }
    }
}

/// How strictly Lidarr validates HTTPS certificates of external sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateValidation {
    #[default]
    Enabled,
    /// Skip validation for hosts on the local network
    LocalDisabled,
    Disabled,
}

impl RemoteEnum for CertificateValidation {
    const ALL: &'static [Self] = &[Self::Enabled, Self::LocalDisabled, Self::Disabled];

    fn remote_value(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::LocalDisabled => "disabledForLocalAddresses",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Socks4,
    Socks5,
}

impl RemoteEnum for ProxyType {
    const ALL: &'static [Self] = &[Self::Http, Self::Socks4, Self::Socks5];

    fn remote_value(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Trace,
}

impl RemoteEnum for LogLevel {
    const ALL: &'static [Self] = &[Self::Info, Self::Debug, Self::Trace];

    fn remote_value(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMechanism {
    Builtin,
    Script,
    External,
    Apt,
    #[default]
    Docker,
}

impl RemoteEnum for UpdateMechanism {
    const ALL: &'static [Self] = &[
        Self::Builtin,
        Self::Script,
        Self::External,
        Self::Apt,
        Self::Docker,
    ];

    fn remote_value(self) -> &'static str {
        match self {
            Self::Builtin => "builtIn",
            Self::Script => "script",
            Self::External => "external",
            Self::Apt => "apt",
            Self::Docker => "docker",
        }
    }
}

// ============================================================================
// Host
// ============================================================================

/// Listening interface and instance name. Changes need a Lidarr restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    /// `*` or an IPv4 address of a local interface
    pub bind_address: String,
    pub port: u16,
    pub ssl_port: u16,
    pub use_ssl: bool,
    pub url_base: Option<String>,
    pub instance_name: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            bind_address: "*".to_string(),
            port: 8989,
            ssl_port: 9898,
            use_ssl: false,
            url_base: None,
            instance_name: "Lidarr".to_string(),
        }
    }
}

const HOST: &[FieldMapping] = &[
    FieldMapping::new("bind_address", "bindAddress"),
    FieldMapping::new("port", "port"),
    FieldMapping::new("ssl_port", "sslPort"),
    FieldMapping::new("use_ssl", "enableSsl"),
    FieldMapping::new("url_base", "urlBase").codec(Codec::OptionalEmptyString),
    FieldMapping::new("instance_name", "instanceName"),
];

impl HostSettings {
    fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.bind_address != "*" && self.bind_address.parse::<Ipv4Addr>().is_err() {
            errors.push(Invalid::new(
                format!("{tree}.bind_address"),
                format!("'{}' is neither '*' nor an IPv4 address", self.bind_address),
            ));
        }
        for (field, port) in [("port", self.port), ("ssl_port", self.ssl_port)] {
            if port == 0 {
                errors.push(Invalid::new(format!("{tree}.{field}"), "port must be 1-65535"));
            }
        }
        if self.instance_name.trim().is_empty() {
            errors.push(Invalid::new(format!("{tree}.instance_name"), "must not be empty"));
        }
    }
}

// ============================================================================
// Security
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecuritySettings {
    pub authentication: AuthenticationMethod,
    /// Administrator username, required when authentication is enabled
    pub username: Option<String>,
    /// Administrator password, required when authentication is enabled
    pub password: Option<String>,
    /// Always sent as a copy of `password`
    #[serde(skip_serializing)]
    pub password_confirmation: Option<String>,
    pub certificate_validation: CertificateValidation,
}

fn password_confirmation(fields: &Fields) -> Result<Value, String> {
    Codec::OptionalEmptyString.encode(fields.get("password").unwrap_or(&Value::Null))
}

const SECURITY: &[FieldMapping] = &[
    FieldMapping::new("authentication", "authenticationMethod")
        .codec(enum_codec::<AuthenticationMethod>()),
    FieldMapping::new("username", "username")
        .codec(Codec::OptionalEmptyString)
        .optional(),
    FieldMapping::new("password", "password")
        .codec(Codec::OptionalEmptyString)
        .optional()
        .formatter(mask_secret),
    FieldMapping::new("password_confirmation", "passwordConfirmation")
        .codec(Codec::OptionalEmptyString)
        .optional()
        .root_encoder(password_confirmation)
        .formatter(mask_secret),
    FieldMapping::new("certificate_validation", "certificateValidation")
        .codec(enum_codec::<CertificateValidation>()),
];

impl SecuritySettings {
    fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.authentication == AuthenticationMethod::None {
            return;
        }
        for (field, value) in [("username", &self.username), ("password", &self.password)] {
            if value.as_deref().is_none_or(str::is_empty) {
                errors.push(Invalid::new(
                    format!("{tree}.{field}"),
                    "required when authentication is enabled",
                ));
            }
        }
    }
}

// ============================================================================
// Proxy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxySettings {
    pub enable: bool,
    pub proxy_type: ProxyType,
    pub hostname: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Domains and addresses that bypass the proxy; `*` wildcards allowed
    pub ignored_addresses: BTreeSet<String>,
    pub bypass_proxy_for_local_addresses: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enable: false,
            proxy_type: ProxyType::Http,
            hostname: None,
            port: 8080,
            username: None,
            password: None,
            ignored_addresses: BTreeSet::new(),
            bypass_proxy_for_local_addresses: true,
        }
    }
}

/// `"a.com, b.com"` to `["a.com", "b.com"]`.
fn decode_bypass_filter(remote: &Value) -> Result<Value, String> {
    let filter = match remote {
        Value::Null => "",
        Value::String(s) => s.as_str(),
        other => return Err(format!("expected a string, got {other}")),
    };
    let addresses: BTreeSet<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .collect();
    Ok(Value::from(addresses.into_iter().collect::<Vec<_>>()))
}

fn encode_bypass_filter(local: &Value) -> Result<Value, String> {
    let addresses: BTreeSet<&str> = match local {
        Value::Null => BTreeSet::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::trim)
                    .ok_or_else(|| format!("expected a string, got {item}"))
            })
            .filter(|addr| !matches!(addr, Ok("")))
            .collect::<Result<_, _>>()?,
        other => return Err(format!("expected a list, got {other}")),
    };
    Ok(Value::from(addresses.into_iter().collect::<Vec<_>>().join(",")))
}

const PROXY: &[FieldMapping] = &[
    FieldMapping::new("enable", "proxyEnabled"),
    FieldMapping::new("proxy_type", "proxyType").codec(enum_codec::<ProxyType>()),
    FieldMapping::new("hostname", "proxyHostname").codec(Codec::OptionalEmptyString),
    FieldMapping::new("port", "proxyPort"),
    FieldMapping::new("username", "proxyUsername").codec(Codec::OptionalEmptyString),
    FieldMapping::new("password", "proxyPassword")
        .codec(Codec::OptionalEmptyString)
        .formatter(mask_secret),
    FieldMapping::new("ignored_addresses", "proxyBypassFilter").codec(Codec::Custom {
        decode: decode_bypass_filter,
        encode: encode_bypass_filter,
    }),
    FieldMapping::new("bypass_proxy_for_local_addresses", "proxyBypassLocalAddresses"),
];

impl ProxySettings {
    fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.port == 0 {
            errors.push(Invalid::new(format!("{tree}.port"), "port must be 1-65535"));
        }
        if self.enable && self.hostname.as_deref().is_none_or(str::is_empty) {
            errors.push(Invalid::new(
                format!("{tree}.hostname"),
                "required when the proxy is enabled",
            ));
        }
        if self.ignored_addresses.iter().any(|addr| addr.trim().is_empty()) {
            errors.push(Invalid::new(
                format!("{tree}.ignored_addresses"),
                "entries must not be empty",
            ));
        }
    }
}

// ============================================================================
// Logging, analytics, updates, backup
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub log_level: LogLevel,
}

const LOGGING: &[FieldMapping] =
    &[FieldMapping::new("log_level", "logLevel").codec(enum_codec::<LogLevel>())];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsSettings {
    pub send_anonymous_usage_data: bool,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            send_anonymous_usage_data: true,
        }
    }
}

const ANALYTICS: &[FieldMapping] =
    &[FieldMapping::new("send_anonymous_usage_data", "analyticsEnabled")];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdatesSettings {
    pub branch: String,
    pub automatic: bool,
    pub mechanism: UpdateMechanism,
    /// Update script, used when `mechanism` is `script`
    pub script_path: Option<String>,
}

impl Default for UpdatesSettings {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            automatic: false,
            mechanism: UpdateMechanism::Docker,
            script_path: None,
        }
    }
}

const UPDATES: &[FieldMapping] = &[
    FieldMapping::new("branch", "branch"),
    FieldMapping::new("automatic", "updateAutomatically"),
    FieldMapping::new("mechanism", "updateMechanism").codec(enum_codec::<UpdateMechanism>()),
    FieldMapping::new("script_path", "updateScriptPath").codec(Codec::OptionalEmptyString),
];

impl UpdatesSettings {
    fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.branch.trim().is_empty() {
            errors.push(Invalid::new(format!("{tree}.branch"), "must not be empty"));
        }
        if self.mechanism == UpdateMechanism::Script
            && self.script_path.as_deref().is_none_or(str::is_empty)
        {
            errors.push(Invalid::new(
                format!("{tree}.script_path"),
                "required when mechanism is 'script'",
            ));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupSettings {
    /// Relative paths are under Lidarr's AppData directory
    pub folder: String,
    /// Days between automatic backups (1-7)
    pub interval: u32,
    /// Days to keep backups (1-90)
    pub retention: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            folder: "Backups".to_string(),
            interval: 7,
            retention: 28,
        }
    }
}

const BACKUP: &[FieldMapping] = &[
    FieldMapping::new("folder", "backupFolder"),
    FieldMapping::new("interval", "backupInterval"),
    FieldMapping::new("retention", "backupRetention"),
];

impl BackupSettings {
    fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.folder.trim().is_empty() {
            errors.push(Invalid::new(format!("{tree}.folder"), "must not be empty"));
        }
        if !(1..=7).contains(&self.interval) {
            errors.push(Invalid::new(format!("{tree}.interval"), "must be 1-7 days"));
        }
        if !(1..=90).contains(&self.retention) {
            errors.push(Invalid::new(format!("{tree}.retention"), "must be 1-90 days"));
        }
    }
}

// ============================================================================
// Group
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSettings {
    pub host: Declared<HostSettings>,
    pub security: Declared<SecuritySettings>,
    pub proxy: Declared<ProxySettings>,
    pub logging: Declared<LoggingSettings>,
    pub analytics: Declared<AnalyticsSettings>,
    pub updates: Declared<UpdatesSettings>,
    pub backup: Declared<BackupSettings>,
}

impl GeneralSettings {
    pub fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        self.host.validate(&format!("{tree}.host"), errors);
        self.security.validate(&format!("{tree}.security"), errors);
        self.proxy.validate(&format!("{tree}.proxy"), errors);
        self.updates.validate(&format!("{tree}.updates"), errors);
        self.backup.validate(&format!("{tree}.backup"), errors);
    }
}

impl SettingsGroup for GeneralSettings {
    fn from_remote(api: &dyn ApiClient) -> reconcile::Result<Self> {
        let config = api.get(HOST_CONFIG)?;
        Ok(Self {
            host: Declared::all(decode_into(HOST, &config)?),
            security: Declared::all(decode_into(SECURITY, &config)?),
            proxy: Declared::all(decode_into(PROXY, &config)?),
            logging: Declared::all(decode_into(LOGGING, &config)?),
            analytics: Declared::all(decode_into(ANALYTICS, &config)?),
            updates: Declared::all(decode_into(UPDATES, &config)?),
            backup: Declared::all(decode_into(BACKUP, &config)?),
        })
    }

    fn update_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        remote: &Self,
        check_unmanaged: bool,
    ) -> reconcile::Result<bool> {
        let resolver = Resolver::new(ctx.sink()).check_unmanaged(check_unmanaged);
        let endpoint = Endpoint::config(HOST_CONFIG);

        let resolutions = [
            resolver.resolve(&format!("{tree}.host"), &self.host, remote.host.value(), HOST)?,
            resolver.resolve(
                &format!("{tree}.security"),
                &self.security,
                remote.security.value(),
                SECURITY,
            )?,
            resolver.resolve(&format!("{tree}.proxy"), &self.proxy, remote.proxy.value(), PROXY)?,
            resolver.resolve(
                &format!("{tree}.logging"),
                &self.logging,
                remote.logging.value(),
                LOGGING,
            )?,
            resolver.resolve(
                &format!("{tree}.analytics"),
                &self.analytics,
                remote.analytics.value(),
                ANALYTICS,
            )?,
            resolver.resolve(
                &format!("{tree}.updates"),
                &self.updates,
                remote.updates.value(),
                UPDATES,
            )?,
            resolver.resolve(
                &format!("{tree}.backup"),
                &self.backup,
                remote.backup.value(),
                BACKUP,
            )?,
        ];

        let mut orchestrator = Orchestrator::new();
        for resolution in resolutions {
            orchestrator.stage(endpoint.clone(), resolution);
        }
        orchestrator.commit(ctx)
    }
}
