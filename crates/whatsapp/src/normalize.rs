//! Conversion of native events and bridge frames into [`InboundMessage`]s.

use std::path::PathBuf;

use {
    tracing::debug,
    wharf_common::{
        InboundMessage, META_IS_GROUP, META_MESSAGE_ID, META_SENDER_JID, META_USER_NAME,
        truncate_for_log,
    },
    wharf_media::{
        MediaDownloader, TransientMedia,
        mime::{extension_from_filename, extension_or},
    },
    wharf_voice::VoiceAnnotator,
};

use crate::{
    CHANNEL_NAME,
    native::client::ProtocolClient,
    types::{BridgeInboundMessage, MediaAttachment, MessageEvent},
};

/// Placeholder appended for stickers, which are not downloaded.
pub const STICKER_PLACEHOLDER: &str = "[sticker]";

/// File name prefix for downloaded attachments.
pub const MEDIA_FILE_PREFIX: &str = "wa_";

const LOG_PREVIEW_CHARS: usize = 50;

/// A message ready for the bus, plus the files it references.
///
/// Dropping `media` deletes the files, so it must outlive the bus call.
#[derive(Debug)]
pub struct Normalized {
    pub message: InboundMessage,
    pub media: TransientMedia,
}

#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    downloader: MediaDownloader,
    voice: VoiceAnnotator,
}

impl MessageNormalizer {
    pub fn new(downloader: MediaDownloader, voice: VoiceAnnotator) -> Self {
        Self { downloader, voice }
    }

    /// Build the canonical message for a native protocol message.
    ///
    /// Returns `None` when nothing representable is left (no text, no
    /// attachment), e.g. for reactions.
    pub async fn normalize_native(
        &self,
        event: &MessageEvent,
        client: &dyn ProtocolClient,
    ) -> Option<Normalized> {
        let info = &event.info;
        let msg = &event.message;
        let sender_id = info.sender.to_string();
        let mut inbound = InboundMessage::new(CHANNEL_NAME, &sender_id, info.chat.to_string());
        let mut media = TransientMedia::new();

        if let Some(text) = [&msg.conversation, &msg.extended_text]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
        {
            inbound.content = text.clone();
        }

        if let Some(image) = &msg.image {
            let ext = extension_or(image.mime_type.as_deref(), ".jpg");
            self.attach(client, image, &ext, &mut inbound, &mut media)
                .await;
            inbound.append_content(image.caption.as_deref().unwrap_or_default());
        }

        if let Some(video) = &msg.video {
            let ext = extension_or(video.mime_type.as_deref(), ".mp4");
            self.attach(client, video, &ext, &mut inbound, &mut media)
                .await;
            inbound.append_content(video.caption.as_deref().unwrap_or_default());
        }

        if let Some(document) = &msg.document {
            let ext = extension_from_filename(document.file_name.as_deref());
            self.attach(client, document, &ext, &mut inbound, &mut media)
                .await;
            inbound.append_content(document.caption.as_deref().unwrap_or_default());
        }

        if let Some(audio) = &msg.audio {
            let ext = extension_or(audio.mime_type.as_deref(), ".ogg");
            if let Some(path) = self
                .attach(client, audio, &ext, &mut inbound, &mut media)
                .await
            {
                let annotation = self.voice.annotate(&path).await;
                inbound.append_content(&annotation);
            }
        }

        if msg.sticker.is_some() {
            inbound.append_content(STICKER_PLACEHOLDER);
        }

        if inbound.is_empty() {
            debug!(message_id = %info.id, "message has no representable content, skipping");
            return None;
        }

        inbound
            .metadata
            .insert(META_MESSAGE_ID.into(), info.id.clone());
        inbound
            .metadata
            .insert(META_SENDER_JID.into(), sender_id.clone());
        if !info.push_name.is_empty() {
            inbound
                .metadata
                .insert(META_USER_NAME.into(), info.push_name.clone());
        }
        if info.is_group {
            inbound
                .metadata
                .insert(META_IS_GROUP.into(), "true".into());
        }

        debug!(
            from = %sender_id,
            content = %truncate_for_log(&inbound.content, LOG_PREVIEW_CHARS),
            media = inbound.media_paths.len(),
            "message received"
        );

        Some(Normalized {
            message: inbound,
            media,
        })
    }

    /// Download one attachment and record it on both the message and the
    /// cleanup guard.
    async fn attach(
        &self,
        client: &dyn ProtocolClient,
        attachment: &MediaAttachment,
        extension: &str,
        inbound: &mut InboundMessage,
        media: &mut TransientMedia,
    ) -> Option<PathBuf> {
        let path = self
            .downloader
            .download(client.download(attachment), extension)
            .await?;
        media.track(path.clone());
        inbound.media_paths.push(path.clone());
        Some(path)
    }
}

/// Build the canonical message for a bridge `"message"` frame.
///
/// Media paths belong to the bridge process and are passed through untouched.
pub fn normalize_bridge(frame: BridgeInboundMessage) -> Option<InboundMessage> {
    let BridgeInboundMessage {
        from,
        chat,
        content,
        media,
        id,
        from_name,
    } = frame;

    if from.is_empty() {
        debug!("bridge message without sender, skipping");
        return None;
    }

    let chat_id = chat.filter(|c| !c.is_empty()).unwrap_or_else(|| from.clone());
    let mut inbound = InboundMessage::new(CHANNEL_NAME, &from, chat_id);
    inbound.content = content;
    inbound.media_paths = media.into_iter().map(PathBuf::from).collect();

    if inbound.is_empty() {
        debug!(from = %from, "bridge message has no content, skipping");
        return None;
    }

    if let Some(id) = id {
        inbound.metadata.insert(META_MESSAGE_ID.into(), id);
    }
    if let Some(name) = from_name {
        inbound.metadata.insert(META_USER_NAME.into(), name);
    }

    debug!(
        from = %from,
        content = %truncate_for_log(&inbound.content, LOG_PREVIEW_CHARS),
        "bridge message received"
    );
    Some(inbound)
}
