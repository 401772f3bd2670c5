use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::QuestionSet;

/// Submitted answers for one session, keyed by question index.
///
/// Indices whose timer ran out without a submission are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<usize, String>);

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record `value` verbatim for `index`, replacing any earlier entry.
    pub fn record(&mut self, index: usize, value: impl Into<String>) {
        self.0.insert(index, value.into());
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Highest recorded index, if any.
    #[must_use]
    pub fn max_index(&self) -> Option<usize> {
        self.0.keys().next_back().copied()
    }

    /// Count of entries that exactly match their question's correct answer.
    ///
    /// Entries pointing past the end of `questions` never count.
    #[must_use]
    pub fn score_against(&self, questions: &QuestionSet) -> u32 {
        let correct = self
            .iter()
            .filter(|(index, answer)| {
                questions
                    .get(*index)
                    .is_some_and(|question| question.is_correct(answer))
            })
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}

impl FromIterator<(usize, String)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;

    fn questions() -> QuestionSet {
        QuestionSet::new(vec![
            Question::numeric("2+2=?", "4").unwrap(),
            Question::multiple_choice(
                "Capital of France?",
                vec!["Paris".into(), "Lyon".into()],
                "Paris",
            )
            .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn scores_only_exact_matches() {
        let mut answers = AnswerMap::new();
        answers.record(0, "4");
        answers.record(1, "paris");
        assert_eq!(answers.score_against(&questions()), 1);
    }

    #[test]
    fn missing_entries_score_nothing() {
        let answers = AnswerMap::new();
        assert_eq!(answers.score_against(&questions()), 0);
        assert!(answers.is_empty());
    }

    #[test]
    fn serializes_with_index_keys() {
        let mut answers = AnswerMap::new();
        answers.record(0, "5");
        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"0":"5"}"#);

        let back: AnswerMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(0), Some("5"));
        assert_eq!(back.max_index(), Some(0));
    }
}
