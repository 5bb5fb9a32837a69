use super::types::Policy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyLimits {
    pub max_entries: usize,
    pub max_subjects_per_entry: usize,
    pub max_resources_per_entry: usize,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_subjects_per_entry: 100,
            max_resources_per_entry: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("too many entries: {count} exceeds limit of {limit}")]
    TooManyEntries { count: usize, limit: usize },
    #[error("too many subjects in entry '{label}': {count} exceeds limit of {limit}")]
    TooManySubjects {
        label: String,
        count: usize,
        limit: usize,
    },
    #[error("too many resources in entry '{label}': {count} exceeds limit of {limit}")]
    TooManyResources {
        label: String,
        count: usize,
        limit: usize,
    },
}

pub fn validate_policy_limits(
    policy: &Policy,
    limits: &PolicyLimits,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if policy.len() > limits.max_entries {
        errors.push(ValidationError::TooManyEntries {
            count: policy.len(),
            limit: limits.max_entries,
        });
    }

    for entry in policy.entries() {
        if entry.subjects().len() > limits.max_subjects_per_entry {
            errors.push(ValidationError::TooManySubjects {
                label: entry.label().to_string(),
                count: entry.subjects().len(),
                limit: limits.max_subjects_per_entry,
            });
        }
        if entry.resources().len() > limits.max_resources_per_entry {
            errors.push(ValidationError::TooManyResources {
                label: entry.label().to_string(),
                count: entry.resources().len(),
                limit: limits.max_resources_per_entry,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_with(max_entries: usize, max_subjects: usize, max_resources: usize) -> PolicyLimits {
        PolicyLimits {
            max_entries,
            max_subjects_per_entry: max_subjects,
            max_resources_per_entry: max_resources,
        }
    }

    fn policy() -> Policy {
        Policy::from_json(
            r#"{ "policyId": "a:b", "entries": {
                "one": {
                    "subjects": { "s:1": {}, "s:2": {}, "s:3": {} },
                    "resources": { "thing:/": { "grant": ["READ"] } }
                },
                "two": {
                    "subjects": { "s:1": {} },
                    "resources": {
                        "thing:/a": { "grant": ["READ"] },
                        "thing:/b": { "grant": ["READ"] }
                    }
                }
            } }"#,
        )
        .unwrap()
    }

    #[test]
    fn policy_within_limits_passes() {
        assert!(validate_policy_limits(&policy(), &PolicyLimits::default()).is_ok());
    }

    #[test]
    fn exceeding_max_entries_rejected() {
        let errors = validate_policy_limits(&policy(), &limits_with(1, 100, 100)).unwrap_err();

        assert_eq!(errors, vec![ValidationError::TooManyEntries { count: 2, limit: 1 }]);
    }

    #[test]
    fn exceeding_max_subjects_names_entry() {
        let errors = validate_policy_limits(&policy(), &limits_with(10, 2, 100)).unwrap_err();

        assert_eq!(
            errors,
            vec![ValidationError::TooManySubjects {
                label: "one".to_string(),
                count: 3,
                limit: 2,
            }]
        );
    }

    #[test]
    fn exceeding_max_resources_names_entry() {
        let errors = validate_policy_limits(&policy(), &limits_with(10, 10, 1)).unwrap_err();

        assert_eq!(
            errors,
            vec![ValidationError::TooManyResources {
                label: "two".to_string(),
                count: 2,
                limit: 1,
            }]
        );
    }

    #[test]
    fn all_violations_are_collected() {
        let errors = validate_policy_limits(&policy(), &limits_with(1, 1, 1)).unwrap_err();

        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn error_messages_include_counts() {
        let err = ValidationError::TooManyEntries {
            count: 120,
            limit: 100,
        };

        assert_eq!(err.to_string(), "too many entries: 120 exceeds limit of 100");
    }
}
