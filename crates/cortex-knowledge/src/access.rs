//! Vector-store filter construction from an [`AccessProfile`].

use cortex_core::types::Classification;

use crate::types::{AccessProfile, KnowledgeFilter};

/// Build the filter a query must satisfy, following the three cases verbatim:
/// non-confidential-only callers get a plain classification filter;
/// confidential-allowed callers with a department list get an `$or` that
/// still lets public/internal through unconditionally; confidential-allowed
/// callers with no department list are treated as non-confidential (there is
/// nothing to scope the confidential branch to).
pub fn build_filter(profile: &AccessProfile) -> KnowledgeFilter {
    let public_internal = KnowledgeFilter::In {
        field: "classification".to_string(),
        values: vec!["public".to_string(), "internal".to_string()],
    };

    let confidential_allowed = profile
        .accessible_classifications
        .contains(&Classification::Confidential);

    match (confidential_allowed, &profile.accessible_department_ids) {
        (true, Some(department_ids)) if !department_ids.is_empty() => KnowledgeFilter::Or(vec![
                public_internal,
                KnowledgeFilter::And(vec![
                        KnowledgeFilter::Eq {
                            field: "classification".to_string(),
                            value: "confidential".to_string(),
                        },
                        KnowledgeFilter::In {
                            field: "department_id".to_string(),
                            values: department_ids.clone(),
                        },
                ]),
        ]),
        _ => public_internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_confidential_profile_filters_to_public_internal_only() {
        let filter = build_filter(&AccessProfile::non_confidential());
        assert_eq!(
            filter,
            KnowledgeFilter::In {
                field: "classification".to_string(),
                values: vec!["public".to_string(), "internal".to_string()],
            }
        );
    }

    #[test]
    fn confidential_profile_with_departments_builds_or_branch() {
        let profile = AccessProfile::confidential_for_departments(vec!["D1".to_string()]);
        let filter = build_filter(&profile);
        match filter {
            KnowledgeFilter::Or(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn confidential_profile_without_departments_excludes_confidential() {
        let profile = AccessProfile {
            accessible_classifications: vec![
                Classification::Public,
                Classification::Internal,
                Classification::Confidential,
            ],
            accessible_department_ids: None,
        };
        let filter = build_filter(&profile);
        assert_eq!(
            filter,
            KnowledgeFilter::In {
                field: "classification".to_string(),
                values: vec!["public".to_string(), "internal".to_string()],
            }
        );
    }
}
