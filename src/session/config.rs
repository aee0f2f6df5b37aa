//! Configuration for session initialization

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected while validating a [`SessionConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// Mode string is neither `peer` nor `client`
	#[error("invalid mode: {mode} (must be \"peer\" or \"client\")")]
	InvalidMode {
		/// The rejected mode string
		mode: String,
	},

	/// Client mode without any endpoint
	#[error("client mode requires at least one endpoint")]
	MissingEndpoints,

	/// Connect timeout is zero
	#[error("connect timeout must be positive")]
	NonPositiveTimeout,

	/// A [`SessionSettings`] value is out of range
	#[error("invalid setting: {0}")]
	InvalidSetting(String),
}

/// How the session joins the network
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	/// Peer, may discover others and listen for connections
	#[default]
	Peer,
	/// Client, connects to explicit endpoints
	Client,
}

impl Mode {
	/// Lowercase name, as accepted by [`Mode::from_str`].
	pub fn as_str(&self) -> &'static str {
		match self {
			| Mode::Peer => "peer",
			| Mode::Client => "client",
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Mode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			| "peer" => Ok(Mode::Peer),
			| "client" => Ok(Mode::Client),
			| other => Err(ConfigError::InvalidMode {
				mode: other.to_string(),
			}),
		}
	}
}

/// Session-level performance and behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
	/// How long `Session::close` waits for queued samples to be delivered
	#[serde(with = "duration_millis", rename = "drain_timeout_millis")]
	pub drain_timeout: Duration,
	/// Maximum number of samples kept for local queries (unbounded if unset)
	pub log_capacity: Option<NonZeroUsize>,
}

impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			drain_timeout: Duration::from_millis(500),
			log_capacity: None,
		}
	}
}

/// Configuration for session creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Peer or client
	pub mode: Mode,
	/// Endpoints to connect to, e.g. `tcp/192.168.1.10:7447`.
	/// Required in client mode.
	#[serde(default)]
	pub endpoints: Vec<String>,
	/// Endpoints to listen on in peer mode, e.g. `tcp/0.0.0.0:7447`
	#[serde(default)]
	pub listen_endpoints: Vec<String>,
	/// Bound on establishing the transport
	#[serde(
		with = "duration_millis",
		rename = "connect_timeout_millis",
		default = "default_connect_timeout"
	)]
	pub connect_timeout: Duration,
	/// Performance and behavior settings
	#[serde(default)]
	pub settings: SessionSettings,
}

fn default_connect_timeout() -> Duration {
	Duration::from_secs(5)
}

impl Default for SessionConfig {
	/// Local peer mode.
	fn default() -> Self {
		Self {
			mode: Mode::Peer,
			endpoints: Vec::new(),
			listen_endpoints: Vec::new(),
			connect_timeout: default_connect_timeout(),
			settings: SessionSettings::default(),
		}
	}
}

impl SessionConfig {
	/// Client mode connecting to `endpoints`
	pub fn client<I, S>(endpoints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			mode: Mode::Client,
			endpoints: endpoints.into_iter().map(Into::into).collect(),
			..Self::default()
		}
	}

	/// Peer mode listening on `listen_endpoints`
	pub fn peer<I, S>(listen_endpoints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			mode: Mode::Peer,
			listen_endpoints: listen_endpoints.into_iter().map(Into::into).collect(),
			..Self::default()
		}
	}

	/// Returns a copy with the given connect timeout
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	/// Returns a copy with the given settings
	pub fn with_settings(mut self, settings: SessionSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Checks the configuration. Runs before any connection attempt.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.mode == Mode::Client && self.endpoints.is_empty() {
			return Err(ConfigError::MissingEndpoints);
		}
		if self.connect_timeout.is_zero() {
			return Err(ConfigError::NonPositiveTimeout);
		}
		if self.settings.drain_timeout.is_zero() {
			return Err(ConfigError::InvalidSetting(
				"drain_timeout must be greater than 0".to_string(),
			));
		}
		Ok(())
	}
}

mod duration_millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where S: Serializer {
		let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
		serializer.serialize_u64(millis)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where D: Deserializer<'de> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
