//! Rule-based chat front end as an explicit state machine.

use tracing::debug;

use crate::error::ClassifierError;
use crate::features::{FeatureKind, FeatureVector};
use crate::label::Label;
use crate::predictor::Predictor;

const GREETING: &str = "Exoura: Hello! I am Exoura, an Exoplanet AI false positive detector.";
const INTRO: &str = "Exoura: Lets start with a few questions.";

/// Where the conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    /// Waiting for feature `i` (model order).
    AwaitingFeature(usize),
    /// All five values held, prediction not yet made.
    Ready,
    /// Prediction delivered; the next step resets.
    Completed,
}

/// Bot output for one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Bot messages, in order.
    pub messages: Vec<String>,
    /// The prediction, on the turn that completed a set of inputs.
    pub prediction: Option<Label>,
}

/// One conversation: five numeric answers, one prediction, then start over.
#[derive(Debug, Clone)]
pub struct ChatSession {
    state: ChatState,
    inputs: FeatureVector,
    transcript: Vec<String>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Start a conversation awaiting the first feature.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ChatState::AwaitingFeature(0),
            inputs: FeatureVector::default(),
            transcript: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Every message exchanged so far, user replies included.
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Opening messages ending with the first question.
    pub fn greet(&mut self) -> Vec<String> {
        let messages = vec![GREETING.to_string(), INTRO.to_string(), self.question()];
        self.transcript.extend(messages.iter().cloned());
        messages
    }

    /// Handle one user reply.
    ///
    /// A non-numeric reply re-asks the same question. The fifth value
    /// triggers a prediction and the session starts over.
    ///
    /// # Errors
    ///
    /// Model and artifact failures from the predictor. Rejected inputs are
    /// answered in the reply instead. The session is back at the first
    /// question either way.
    pub fn submit(
        &mut self,
        raw: &str,
        predictor: &Predictor,
    ) -> Result<ChatReply, ClassifierError> {
        self.transcript.push(raw.to_string());
        let reply = self.step(raw, predictor);
        if let Ok(reply) = &reply {
            self.transcript.extend(reply.messages.iter().cloned());
        }
        reply
    }

    fn step(&mut self, raw: &str, predictor: &Predictor) -> Result<ChatReply, ClassifierError> {
        let ChatState::AwaitingFeature(i) = self.state else {
            self.reset();
            return Ok(self.reply(vec![self.question()], None));
        };
        let kind = FeatureKind::ALL[i];
        let value = match kind.parse_value(raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(%kind, %err, "rejected chat input");
                return Ok(self.reply(vec![format!("Exoura: {err}. {}", self.question())], None));
            }
        };
        self.inputs.set(kind, value);

        if i + 1 < FeatureKind::ALL.len() {
            self.state = ChatState::AwaitingFeature(i + 1);
            return Ok(self.reply(vec![self.question()], None));
        }

        self.state = ChatState::Ready;
        let outcome = predictor.predict(&self.inputs);
        self.state = ChatState::Completed;
        let reply = match outcome {
            Ok(label) => {
                let verdict = format!("Exoura: Based on the inputs, the prediction is: {label}.");
                self.reset();
                self.reply(vec![verdict, self.restart()], Some(label))
            }
            Err(ClassifierError::Input(err)) => {
                self.reset();
                self.reply(vec![format!("Exoura: {err}."), self.restart()], None)
            }
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };
        Ok(reply)
    }

    fn reset(&mut self) {
        self.state = ChatState::AwaitingFeature(0);
        self.inputs = FeatureVector::default();
    }

    fn question(&self) -> String {
        let i = match self.state {
            ChatState::AwaitingFeature(i) => i,
            ChatState::Ready | ChatState::Completed => 0,
        };
        format!("Exoura: Please input {}", FeatureKind::ALL[i].column())
    }

    fn restart(&self) -> String {
        format!("Exoura: Let's start over. Please input {}", FeatureKind::ALL[0].column())
    }

    fn reply(&self, messages: Vec<String>, prediction: Option<Label>) -> ChatReply {
        ChatReply { messages, prediction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::tests::toy_predictor;

    #[test]
    fn greeting_ends_with_first_question() {
        let mut chat = ChatSession::new();
        let messages = chat.greet();
        assert_eq!(messages[0], GREETING);
        assert_eq!(messages[1], INTRO);
        assert_eq!(messages[2], "Exoura: Please input koi_period");
    }

    #[test]
    fn five_values_yield_one_prediction_and_reset() {
        let predictor = toy_predictor();
        let mut chat = ChatSession::new();
        chat.greet();

        let mut predictions = Vec::new();
        for (i, raw) in ["1.5", "2.0", "9010", "30", "905"].iter().enumerate() {
            assert_eq!(chat.state(), ChatState::AwaitingFeature(i));
            let reply = chat.submit(raw, &predictor).unwrap();
            predictions.extend(reply.prediction);
            if i < 4 {
                assert_eq!(
                    reply.messages,
                    vec![format!("Exoura: Please input {}", FeatureKind::ALL[i + 1].column())]
                );
            } else {
                assert_eq!(
                    reply.messages[0],
                    "Exoura: Based on the inputs, the prediction is: False Positive."
                );
                assert_eq!(reply.messages[1], "Exoura: Let's start over. Please input koi_period");
            }
        }
        assert_eq!(predictions, vec![Label::FalsePositive]);
        assert_eq!(chat.state(), ChatState::AwaitingFeature(0));
    }

    #[test]
    fn non_numeric_reply_keeps_state() {
        let predictor = toy_predictor();
        let mut chat = ChatSession::new();
        chat.submit("12.5", &predictor).unwrap();
        let reply = chat.submit("twelve", &predictor).unwrap();

        assert_eq!(chat.state(), ChatState::AwaitingFeature(1));
        assert_eq!(reply.prediction, None);
        assert!(reply.messages[0].ends_with("Exoura: Please input koi_duration"));
        assert!(reply.messages[0].contains("twelve"));

        let reply = chat.submit("NaN", &predictor).unwrap();
        assert_eq!(chat.state(), ChatState::AwaitingFeature(1));
        assert!(reply.messages[0].contains("finite"));
    }

    #[test]
    fn second_round_starts_clean() {
        let predictor = toy_predictor();
        let mut chat = ChatSession::new();
        let mut count = 0;
        for raw in ["15", "3", "505", "2", "25", "1.5", "2", "9010", "30", "905"] {
            if let Some(label) = chat.submit(raw, &predictor).unwrap().prediction {
                count += 1;
                let expected = if count == 1 {
                    Label::NotFalsePositive
                } else {
                    Label::FalsePositive
                };
                assert_eq!(label, expected);
            }
        }
        assert_eq!(count, 2);
        assert_eq!(chat.transcript().len(), 10 + 4 + 2 + 4 + 2);
    }

    #[test]
    fn range_violation_is_answered_not_raised() {
        let predictor =
            toy_predictor().with_range_policy(crate::features::RangePolicy::NonNegative);
        let mut chat = ChatSession::new();
        let mut last = None;
        for raw in ["-1", "2", "3", "4", "5"] {
            last = Some(chat.submit(raw, &predictor).unwrap());
        }
        let reply = last.unwrap();
        assert_eq!(reply.prediction, None);
        assert!(reply.messages[0].contains("non-negative"));
        assert_eq!(chat.state(), ChatState::AwaitingFeature(0));
    }
}
