use replyflow_core::Candidate;
use std::collections::HashSet;

/// Applies the eligibility predicates; every one must pass.
///
/// An empty result is a valid run outcome ("no eligible content"), not an
/// error, so this never fails.
pub fn eligible_candidates<F>(
    candidates: Vec<Candidate>,
    already_replied: &HashSet<String>,
    minimum_engagement: u32,
    own_identity: &str,
    is_deleted_author: F,
) -> Vec<Candidate>
where
    F: Fn(&str) -> bool,
{
    candidates
        .into_iter()
        .filter(|candidate| {
            !already_replied.contains(&candidate.id)
                && candidate.engagement >= minimum_engagement
                && !candidate.author.eq_ignore_ascii_case(own_identity)
                && !is_deleted_author(&candidate.author)
        })
        .collect()
}
