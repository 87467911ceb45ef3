use hrdesk_core::domain::employee::EmployeeId;

pub const ACCESS_DENIED: &str = "Access Denied";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    /// Reading an employee record: leave balance or personal details.
    EmployeeRecord { target: EmployeeId },
    /// Touching the caller's own conversation memory.
    OwnMemory,
    /// Resetting the history named by a `chat_history_<ID>.txt` target.
    ClearHistory { owner: EmployeeId },
}

impl GuardrailIntent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::EmployeeRecord { .. } => "employee.record_read",
            Self::OwnMemory => "memory.own",
            Self::ClearHistory { .. } => "memory.clear",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow { employee_id: EmployeeId },
    Deny { reason_code: &'static str, user_message: String },
}

/// Every identity-scoped tool asks this policy before touching a store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy;

impl GuardrailPolicy {
    pub fn evaluate(
        &self,
        session_id: Option<&EmployeeId>,
        intent: &GuardrailIntent,
    ) -> GuardrailDecision {
        let Some(session_id) = session_id else {
            return GuardrailDecision::Deny {
                reason_code: "not_authenticated",
                user_message: ACCESS_DENIED.to_string(),
            };
        };

        match intent {
            GuardrailIntent::EmployeeRecord { target } if target != session_id => {
                GuardrailDecision::Deny {
                    reason_code: "identity_mismatch",
                    user_message: ACCESS_DENIED.to_string(),
                }
            }
            GuardrailIntent::ClearHistory { owner } if owner != session_id => {
                GuardrailDecision::Deny {
                    reason_code: "history_owner_mismatch",
                    user_message: format!(
                        "You can only clear your own chat history. Use chat_history_{session_id}.txt."
                    ),
                }
            }
            GuardrailIntent::EmployeeRecord { .. }
            | GuardrailIntent::OwnMemory
            | GuardrailIntent::ClearHistory { .. } => {
                GuardrailDecision::Allow { employee_id: session_id.clone() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_core::domain::employee::EmployeeId;

    use super::{GuardrailDecision, GuardrailIntent, GuardrailPolicy, ACCESS_DENIED};

    fn emp(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).expect("valid id")
    }

    #[test]
    fn own_record_is_allowed() {
        let decision = GuardrailPolicy
            .evaluate(Some(&emp("EMP123")), &GuardrailIntent::EmployeeRecord { target: emp("EMP123") });
        assert_eq!(decision, GuardrailDecision::Allow { employee_id: emp("EMP123") });
    }

    #[test]
    fn foreign_record_is_denied_with_sentinel() {
        let decision = GuardrailPolicy
            .evaluate(Some(&emp("EMP123")), &GuardrailIntent::EmployeeRecord { target: emp("EMP456") });

        let (reason_code, user_message) = match decision {
            GuardrailDecision::Deny { reason_code, user_message } => (reason_code, user_message),
            _ => ("", String::new()),
        };
        assert_eq!(reason_code, "identity_mismatch");
        assert_eq!(user_message, ACCESS_DENIED);
    }

    #[test]
    fn missing_session_denies_everything() {
        for intent in [
            GuardrailIntent::OwnMemory,
            GuardrailIntent::EmployeeRecord { target: emp("EMP123") },
            GuardrailIntent::ClearHistory { owner: emp("EMP123") },
        ] {
            let decision = GuardrailPolicy.evaluate(None, &intent);
            assert!(
                matches!(decision, GuardrailDecision::Deny { reason_code: "not_authenticated", .. }),
                "{}",
                intent.action_key()
            );
        }
    }

    #[test]
    fn clearing_someone_elses_history_names_the_right_file() {
        let decision = GuardrailPolicy
            .evaluate(Some(&emp("EMP123")), &GuardrailIntent::ClearHistory { owner: emp("EMP456") });

        match decision {
            GuardrailDecision::Deny { reason_code, user_message } => {
                assert_eq!(reason_code, "history_owner_mismatch");
                assert!(user_message.contains("only clear your own"));
                assert!(user_message.contains("chat_history_EMP123.txt"));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }
}
