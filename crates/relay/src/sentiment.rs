//! Sentiment aggregate over the delivery store

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use kronos_core::{DeliveredMessage, SentimentSummary};

#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Scoring request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unrecognized sentiment label: {0}")]
    UnknownLabel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl FromStr for Sentiment {
    type Err = SentimentError;

    /// Case-insensitive, ignores surrounding punctuation and whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match label.as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            _ => Err(SentimentError::UnknownLabel(s.to_string())),
        }
    }
}

/// Classifies a single message text
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(&self, text: &str) -> Result<Sentiment, SentimentError>;
}

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "love", "happy", "excellent", "awesome", "nice", "thanks", "wonderful", "glad",
    "best", "fantastic", "like", "enjoy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "hate", "sad", "awful", "angry", "worst", "horrible", "poor", "broken",
    "wrong", "annoying", "dislike", "fail",
];

/// Word-list scorer used when no external classifier is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn classify(text: &str) -> Sentiment {
        let mut score: i32 = 0;
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            if POSITIVE_WORDS.contains(&word.as_str()) {
                score += 1;
            } else if NEGATIVE_WORDS.contains(&word.as_str()) {
                score -= 1;
            }
        }
        match score.signum() {
            1 => Sentiment::Positive,
            -1 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

#[async_trait]
impl SentimentScorer for LexiconScorer {
    async fn score(&self, text: &str) -> Result<Sentiment, SentimentError> {
        Ok(Self::classify(text))
    }
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    sentiment: String,
}

/// External classifier: `POST {endpoint}` with `{"text"}`, expects `{"sentiment"}`
#[derive(Debug, Clone)]
pub struct HttpSentimentScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSentimentScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SentimentScorer for HttpSentimentScorer {
    async fn score(&self, text: &str) -> Result<Sentiment, SentimentError> {
        let response: ScoreResponse = self
            .client
            .post(&self.endpoint)
            .json(&ScoreRequest { text })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.sentiment.parse()
    }
}

/// Score every message concurrently and count the labels.
///
/// A message that fails to score counts as neutral.
pub async fn aggregate_sentiment(
    messages: &[DeliveredMessage],
    scorer: &dyn SentimentScorer,
) -> SentimentSummary {
    let scores = join_all(messages.iter().map(|m| scorer.score(&m.content))).await;

    let mut summary = SentimentSummary {
        total_posts: messages.len(),
        ..Default::default()
    };
    for (message, score) in messages.iter().zip(scores) {
        match score {
            Ok(Sentiment::Positive) => summary.positive += 1,
            Ok(Sentiment::Negative) => summary.negative += 1,
            Ok(Sentiment::Neutral) => summary.neutral += 1,
            Err(e) => {
                warn!("Scoring message {} failed, counting as neutral: {}", message.id, e);
                summary.neutral += 1;
            }
        }
    }

    debug!(
        "Sentiment over {} posts: +{} ={} -{}",
        summary.total_posts, summary.positive, summary.neutral, summary.negative
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kronos_core::NewMessage;

    struct FlakyScorer;

    #[async_trait]
    impl SentimentScorer for FlakyScorer {
        async fn score(&self, text: &str) -> Result<Sentiment, SentimentError> {
            if text.contains("??") {
                Err(SentimentError::UnknownLabel("mixed".to_string()))
            } else {
                Ok(LexiconScorer::classify(text))
            }
        }
    }

    fn messages(contents: &[&str]) -> Vec<DeliveredMessage> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| NewMessage::anonymous(*c).into_delivered(i as u64 + 1, Utc::now()))
            .collect()
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("Positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!(" negative.\n".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert_eq!("\"NEUTRAL\"".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
        assert!("meh".parse::<Sentiment>().is_err());
    }

    #[test]
    fn test_lexicon_classify() {
        assert_eq!(LexiconScorer::classify("I love this, great work"), Sentiment::Positive);
        assert_eq!(LexiconScorer::classify("This is terrible and BROKEN"), Sentiment::Negative);
        assert_eq!(LexiconScorer::classify("The meeting is at noon"), Sentiment::Neutral);
        assert_eq!(LexiconScorer::classify("good but bad"), Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_aggregate_counts() {
        let msgs = messages(&["great day", "awful commute", "hello", "nice"]);
        let summary = aggregate_sentiment(&msgs, &LexiconScorer).await;
        assert_eq!(
            summary,
            SentimentSummary {
                positive: 2,
                neutral: 1,
                negative: 1,
                total_posts: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_score_counts_neutral() {
        let msgs = messages(&["great", "what ??", "bad"]);
        let summary = aggregate_sentiment(&msgs, &FlakyScorer).await;
        assert_eq!(summary.neutral, 1);
        assert_eq!(summary.total_posts, 3);
        assert_eq!(summary.positive + summary.neutral + summary.negative, summary.total_posts);
    }

    #[tokio::test]
    async fn test_empty_store_is_zero() {
        let summary = aggregate_sentiment(&[], &LexiconScorer).await;
        assert_eq!(summary, SentimentSummary::default());
    }
}
