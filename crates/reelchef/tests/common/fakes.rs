//! Recording fakes for the external collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use reelchef::language::Language;
use reelchef::link::Platform;
use reelchef::llm::{LlmError, LlmProvider};
use reelchef::metadata::{AuthorInfo, MediaResolver, MetadataError, MetadataProvider, VideoMetadata};
use reelchef::notify::{Notifier, NotifyError};
use reelchef::transcript::{TranscriptError, TranscriptProvider};

/// Transcript provider answering every URL with the same scripted result.
pub struct FakeTranscripts {
    result: Mutex<Result<String, TranscriptError>>,
    calls: Mutex<Vec<(String, Option<Language>)>>,
}

impl FakeTranscripts {
    pub fn new(transcript: &str) -> Self {
        Self {
            result: Mutex::new(Ok(transcript.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, result: Result<String, TranscriptError>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> Vec<(String, Option<Language>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptProvider for FakeTranscripts {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn fetch(
        &self,
        source_url: &str,
        language: Option<Language>,
    ) -> Result<String, TranscriptError> {
        self.calls
            .lock()
            .unwrap()
            .push((source_url.to_string(), language));
        self.result.lock().unwrap().clone()
    }
}

/// Language model returning a fixed reply, optionally after a delay.
pub struct FakeLlm {
    reply: Mutex<String>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(reply: &str) -> Self {
        Self::with_delay(reply, Duration::ZERO)
    }

    pub fn with_delay(reply: &str, delay: Duration) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            delay,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// System prompts seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, system_prompt: &str, _user_message: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(system_prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

/// Metadata provider with canned entries per source URL.
#[derive(Default)]
pub struct FakeMetadata {
    entries: Mutex<HashMap<String, VideoMetadata>>,
    calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn insert(&self, source_url: &str, metadata: VideoMetadata) {
        self.entries
            .lock()
            .unwrap()
            .insert(source_url.to_string(), metadata);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn fetch(
        &self,
        source_url: &str,
        _platform: Platform,
    ) -> Result<VideoMetadata, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .get(source_url)
            .cloned()
            .ok_or(MetadataError::Status(404))
    }
}

/// Media resolver with optional fixed answers.
#[derive(Default)]
pub struct FakeMedia {
    pub avatar: Option<String>,
    pub thumbnail: Option<String>,
}

#[async_trait]
impl MediaResolver for FakeMedia {
    async fn avatar(&self, _platform: Platform, _username: &str) -> Option<String> {
        self.avatar.clone()
    }

    async fn thumbnail(&self, _platform: Platform, _source_url: &str) -> Option<String> {
        self.thumbnail.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages_for(&self, channel: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

/// Metadata for a TikTok video by `@noodlechef`.
pub fn tiktok_metadata() -> VideoMetadata {
    VideoMetadata {
        title: Some("Garlic noodles in 10 minutes #easyrecipe".to_string()),
        description: Some("Garlic noodles in 10 minutes #easyrecipe".to_string()),
        author: Some(AuthorInfo {
            username: "noodlechef".to_string(),
            display_name: Some("Noodle Chef".to_string()),
            avatar_url: Some("https://cdn.example/provider-avatar.jpg".to_string()),
            verified: true,
        }),
        thumbnail_url: Some("https://cdn.example/provider-thumb.jpg".to_string()),
        ..VideoMetadata::empty(Platform::Tiktok)
    }
}
