use replyflow_core::Candidate;

/// Picks the single candidate this run replies to: highest engagement wins,
/// ties keep fetch order. The sort must stay stable so selection is
/// reproducible.
pub fn select_candidate(mut eligible: Vec<Candidate>) -> Option<Candidate> {
    eligible.sort_by(|a, b| b.engagement.cmp(&a.engagement));
    eligible.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate(id: &str, engagement: u32) -> Candidate {
        Candidate {
            id: id.to_string(),
            author: "someone".to_string(),
            title: None,
            body: "text".to_string(),
            engagement,
            reply_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn highest_engagement_wins() {
        let selected = select_candidate(vec![
            candidate("a", 3),
            candidate("b", 20),
            candidate("c", 11),
        ]);
        assert_eq!(selected.unwrap().id, "b");
    }

    #[test]
    fn ties_keep_fetch_order() {
        let selected = select_candidate(vec![candidate("x", 20), candidate("y", 20)]);
        assert_eq!(selected.unwrap().id, "x");
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_candidate(Vec::new()).is_none());
    }

    #[test]
    fn selection_is_deterministic() {
        let candidates = vec![
            candidate("a", 7),
            candidate("b", 7),
            candidate("c", 9),
            candidate("d", 9),
        ];
        for _ in 0..10 {
            assert_eq!(select_candidate(candidates.clone()).unwrap().id, "c");
        }
    }
}
