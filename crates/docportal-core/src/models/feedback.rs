use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub title: String,
    pub feedback: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Per-field validation messages for the feedback form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackErrors {
    pub title: Option<&'static str>,
    pub feedback: Option<&'static str>,
}

impl FeedbackErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.feedback.is_none()
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.title.into_iter().chain(self.feedback).collect()
    }
}

impl Feedback {
    /// Validate and trim the form fields, stamping the submission time.
    pub fn new(title: &str, feedback: &str) -> Result<Self, FeedbackErrors> {
        let title = title.trim();
        let feedback = feedback.trim();

        let errors = FeedbackErrors {
            title: title.is_empty().then_some("Value required."),
            feedback: feedback.is_empty().then_some("Please enter your feedback."),
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            title: title.to_string(),
            feedback: feedback.to_string(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_is_trimmed() {
        let fb = Feedback::new("  Upload bug ", "\nThe form hangs.\n").unwrap();
        assert_eq!(fb.title, "Upload bug");
        assert_eq!(fb.feedback, "The form hangs.");
    }

    #[test]
    fn test_feedback_requires_both_fields() {
        let errors = Feedback::new(" ", "").unwrap_err();
        assert_eq!(errors.title, Some("Value required."));
        assert_eq!(errors.feedback, Some("Please enter your feedback."));
        assert_eq!(errors.messages().len(), 2);

        let errors = Feedback::new("Title", "  ").unwrap_err();
        assert_eq!(errors.title, None);
        assert_eq!(errors.messages(), vec!["Please enter your feedback."]);
    }

    #[test]
    fn test_feedback_serializes_created_at_in_camel_case() {
        let fb = Feedback::new("t", "f").unwrap();
        let value = serde_json::to_value(&fb).unwrap();
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["title"], "t");
    }
}
