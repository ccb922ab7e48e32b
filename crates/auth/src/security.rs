//! Security audit events.
//!
//! A closed vocabulary of security-relevant moments in the credential
//! lifecycle. Events are emitted through `tracing` under the `security`
//! target so operators can route them separately from application logs.

use serde_json::Value as JsonValue;

/// Security-relevant audit event names.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFail,
    LinkAccountSuccess,
    RoleChange,
    BootstrapSuccess,
    BootstrapFail,
}

impl SecurityEvent {
    pub fn name(self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "auth.login.success",
            SecurityEvent::LoginFail => "auth.login.fail",
            SecurityEvent::LinkAccountSuccess => "auth.link_account.success",
            SecurityEvent::RoleChange => "auth.role_change",
            SecurityEvent::BootstrapSuccess => "auth.bootstrap.success",
            SecurityEvent::BootstrapFail => "auth.bootstrap.fail",
        }
    }

    /// Emit the event with a structured payload.
    pub fn emit(self, payload: JsonValue) {
        tracing::info!(target: "security", event = self.name(), payload = %payload);
    }
}

impl core::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_stable() {
        assert_eq!(SecurityEvent::RoleChange.name(), "auth.role_change");
        assert_eq!(SecurityEvent::BootstrapFail.name(), "auth.bootstrap.fail");
    }
}
