//! Conversation handlers: link intake, menu navigation, download triggering

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::platform::Platform;
use crate::core::utils::format_duration;
use crate::download::pipeline::{self, Delivery, DownloadJob};
use crate::download::{FormatSelector, MediaEngine};
use crate::format::{derive_audio_formats, derive_video_formats};
use crate::i18n::{self, t};
use crate::session::{Session, SessionStore};
use crate::telegram::bot::Bot;
use crate::telegram::callback::CallbackEvent;
use crate::telegram::delivery::TelegramDelivery;
use crate::telegram::keyboards;

/// Shared collaborators injected into every handler.
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<SessionStore>,
    pub engine: Arc<dyn MediaEngine>,
}

/// Handles a plain text message: anything that is not a link gets a hint,
/// links get classified, probed and answered with the metadata summary plus
/// the platform's top-level menu.
pub async fn handle_message(bot: Bot, msg: Message, deps: HandlerDeps) -> AppResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let text = text.trim();
    let chat_id = msg.chat.id;
    let lang = i18n::lang_from_telegram(msg.from.as_ref().and_then(|u| u.language_code.as_deref()));

    if !(text.starts_with("http://") || text.starts_with("https://")) {
        bot.send_message(chat_id, t(&lang, "send-link-hint")).await?;
        return Ok(());
    }

    // Sessions are keyed by user, with the chat id as a fallback for
    // anonymous channel posts.
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(chat_id.0);
    let status = bot.send_message(chat_id, t(&lang, "url-processing")).await?;

    let platform = Platform::classify(text);
    if platform == Platform::Unknown {
        bot.edit_message_text(chat_id, status.id, t(&lang, "error-unsupported-platform"))
            .await?;
        return Ok(());
    }

    let url = match Url::parse(text) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Unparsable URL from user {}: {}", user_id, e);
            bot.edit_message_text(chat_id, status.id, t(&lang, "error-metadata")).await?;
            return Ok(());
        }
    };

    let probe = match deps.engine.probe(&url).await {
        Ok(probe) => probe,
        Err(e) => {
            log::error!("Metadata probe failed for {} ({}): {}", url, e.subcategory(), e);
            bot.edit_message_text(chat_id, status.id, t(&lang, "error-metadata")).await?;
            return Ok(());
        }
    };

    // Only YouTube offers a quality menu, so only YouTube needs the ladders.
    let (video_formats, audio_formats) = if platform.has_quality_menu() {
        (derive_video_formats(&probe.formats), derive_audio_formats(&probe.formats))
    } else {
        (Vec::new(), Vec::new())
    };

    if platform.has_quality_menu() && video_formats.is_empty() && audio_formats.is_empty() {
        bot.edit_message_text(chat_id, status.id, t(&lang, "error-no-formats")).await?;
        return Ok(());
    }

    deps.store.put(Session {
        user_id,
        url,
        title: probe.title.clone(),
        uploader: probe.uploader.clone(),
        platform,
        video_formats,
        audio_formats,
    });

    let duration = probe
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "N/A".to_string());
    let mut args = FluentArgs::new();
    args.set("emoji", platform.emoji());
    args.set("title", probe.title.as_str());
    args.set("uploader", probe.uploader.as_str());
    args.set("duration", duration);

    let summary = i18n::t_args(&lang, "summary", &args);
    drop(args);

    with_session_cleanup(&deps.store, user_id, async {
        bot.edit_message_text(chat_id, status.id, summary)
            .reply_markup(keyboards::top_menu(platform, &lang))
            .await?;
        Ok(())
    })
    .await
}

/// Runs the tail of a flow that already created a session; on failure the
/// session is dropped so no half-built conversation is left behind.
async fn with_session_cleanup<F>(store: &SessionStore, user_id: i64, fut: F) -> AppResult<()>
where
    F: std::future::Future<Output = AppResult<()>>,
{
    let result = fut.await;
    if result.is_err() {
        store.delete(user_id);
    }
    result
}

/// Handles a menu button press. Navigation events re-render the menus;
/// format selections claim the session (removing it from the store) before
/// running the download pipeline, so overlapping presses from one user
/// resolve to one download plus expired answers.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> AppResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let user_id = q.from.id.0 as i64;
    let lang = i18n::lang_from_telegram(q.from.language_code.as_deref());

    let event = match CallbackEvent::parse(data) {
        Ok(event) => event,
        Err(e) => {
            // Tampered or truncated payload; drop the session so the user
            // starts over from a clean state.
            log::warn!("Rejected callback from user {}: {}", user_id, e);
            deps.store.delete(user_id);
            bot.edit_message_text(chat_id, message_id, t(&lang, "error-generic")).await?;
            return Ok(());
        }
    };

    match &event {
        // Navigation only reads the session
        CallbackEvent::Back | CallbackEvent::SelectVideoMenu | CallbackEvent::SelectAudioMenu => {
            let Some(session) = deps.store.get(user_id) else {
                return session_expired(&bot, chat_id, message_id, &lang).await;
            };

            match &event {
                CallbackEvent::SelectVideoMenu if session.platform.has_quality_menu() => {
                    bot.edit_message_text(chat_id, message_id, t(&lang, "choose-video-quality"))
                        .reply_markup(keyboards::video_quality_menu(&session.video_formats, &lang))
                        .await?;
                }
                CallbackEvent::SelectAudioMenu if session.platform.has_quality_menu() => {
                    bot.edit_message_text(chat_id, message_id, t(&lang, "choose-audio-quality"))
                        .reply_markup(keyboards::audio_quality_menu(&session.audio_formats, &lang))
                        .await?;
                }
                _ => render_top_menu(&bot, chat_id, message_id, &session, &lang).await?,
            }
        }
        // Selections claim the session atomically: a second press on the
        // same keyboard finds it gone and is answered as expired, so one
        // keyboard can never start two downloads.
        _ => {
            let Some(session) = deps.store.take(user_id) else {
                return session_expired(&bot, chat_id, message_id, &lang).await;
            };

            match resolve_selection(&session, &event) {
                Some((selector, quality_label)) => {
                    run_download(&bot, chat_id, message_id, &deps, session, selector, quality_label, &lang).await?;
                }
                None => {
                    // A button from a keyboard that no longer matches the live
                    // session (e.g. a new link replaced it). Re-anchor at the
                    // top and hand the session back.
                    log::debug!("Stale menu event {:?} for user {}", event, user_id);
                    render_top_menu(&bot, chat_id, message_id, &session, &lang).await?;
                    deps.store.put(session);
                }
            }
        }
    }

    Ok(())
}

async fn session_expired(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    lang: &unic_langid::LanguageIdentifier,
) -> AppResult<()> {
    bot.edit_message_text(chat_id, message_id, t(lang, "error-session-expired"))
        .await?;
    Ok(())
}

async fn render_top_menu(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    session: &Session,
    lang: &unic_langid::LanguageIdentifier,
) -> AppResult<()> {
    let mut args = FluentArgs::new();
    args.set("title", session.title.as_str());

    bot.edit_message_text(chat_id, message_id, i18n::t_args(lang, "choose-option", &args))
        .reply_markup(keyboards::top_menu(session.platform, lang))
        .await?;

    Ok(())
}

/// Maps a selection event onto a format selector and its caption label,
/// validating it against what the session actually offered.
fn resolve_selection(session: &Session, event: &CallbackEvent) -> Option<(FormatSelector, String)> {
    let has_menu = session.platform.has_quality_menu();

    match event {
        CallbackEvent::QuickVideoBest if !has_menu => Some((FormatSelector::VideoBest, "HD".to_string())),
        CallbackEvent::QuickAudioBest if !has_menu => {
            let bitrate_kbps = config::formats::QUICK_AUDIO_BITRATE;
            Some((
                FormatSelector::AudioBest { bitrate_kbps },
                format!("MP3 {}kbps", bitrate_kbps),
            ))
        }
        CallbackEvent::ChooseVideo { format_id } if has_menu => {
            let format = session.video_formats.iter().find(|f| f.format_id == *format_id)?;
            Some((
                FormatSelector::Video { format_id: format.format_id.clone() },
                format.label(),
            ))
        }
        CallbackEvent::ChooseAudio { format_id, bitrate_kbps } if has_menu => {
            let format = session
                .audio_formats
                .iter()
                .find(|f| f.format_id == *format_id && f.bitrate_kbps == *bitrate_kbps)?;
            Some((
                FormatSelector::Audio {
                    format_id: format.format_id.clone(),
                    bitrate_kbps: format.bitrate_kbps,
                },
                format.label(),
            ))
        }
        _ => None,
    }
}

/// Wraps the transport delivery with a supersession check: when the user
/// started a new conversation while the download ran, the stale result is
/// discarded instead of sent, and the new session is left untouched.
struct GuardedDelivery<D> {
    inner: D,
    store: Arc<SessionStore>,
    user_id: i64,
    suppressed: AtomicBool,
}

impl<D> GuardedDelivery<D> {
    fn new(inner: D, store: Arc<SessionStore>, user_id: i64) -> Self {
        Self { inner, store, user_id, suppressed: AtomicBool::new(false) }
    }

    fn was_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// The downloading session was already claimed, so any session present
    /// now belongs to a newer link from the same user.
    fn superseded(&self) -> bool {
        self.store.get(self.user_id).is_some()
    }
}

#[async_trait]
impl<D: Delivery> Delivery for GuardedDelivery<D> {
    async fn deliver_video(&self, path: &Path, caption: &str) -> Result<(), AppError> {
        if self.superseded() {
            self.suppressed.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.inner.deliver_video(path, caption).await
    }

    async fn deliver_audio(&self, path: &Path, title: &str, performer: &str, caption: &str) -> Result<(), AppError> {
        if self.superseded() {
            self.suppressed.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.inner.deliver_audio(path, title, performer, caption).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_download(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    deps: &HandlerDeps,
    session: Session,
    selector: FormatSelector,
    quality_label: String,
    lang: &unic_langid::LanguageIdentifier,
) -> AppResult<()> {
    let downloading_key = if selector.is_audio() { "downloading-audio" } else { "downloading-video" };
    bot.edit_message_text(chat_id, message_id, t(lang, downloading_key)).await?;

    let job = DownloadJob {
        url: session.url.clone(),
        selector,
        title: session.title.clone(),
        performer: session.uploader.clone(),
        quality_label,
        scope: DownloadJob::scope_for(chat_id.0),
        lang: lang.clone(),
    };

    let delivery = GuardedDelivery::new(
        TelegramDelivery::new(bot.clone(), chat_id, message_id, lang.clone()),
        deps.store.clone(),
        session.user_id,
    );
    let result = pipeline::execute(deps.engine.as_ref(), &delivery, &job).await;

    if delivery.was_suppressed() {
        log::info!("Discarding stale result for user {}: a newer link superseded it", session.user_id);
        return Ok(());
    }

    match result {
        Ok(()) => {
            bot.edit_message_text(chat_id, message_id, t(lang, "done")).await?;
        }
        Err(e) => {
            log::error!("Download failed for user {}: {}", session.user_id, e);
            bot.edit_message_text(chat_id, message_id, t(lang, e.user_message_key()))
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioFormat, VideoFormat};
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn youtube_session() -> Session {
        Session {
            user_id: 1,
            url: Url::parse("https://youtu.be/abc").unwrap(),
            title: "Video".to_string(),
            uploader: "Channel".to_string(),
            platform: Platform::YouTube,
            video_formats: vec![VideoFormat {
                format_id: "137+140".to_string(),
                resolution: "1080p".to_string(),
                height: 1080,
                fps: 30,
                filesize: 0,
            }],
            audio_formats: vec![AudioFormat {
                format_id: "251".to_string(),
                bitrate_kbps: 128,
                filesize: 0,
            }],
        }
    }

    fn tiktok_session() -> Session {
        Session {
            platform: Platform::TikTok,
            video_formats: Vec::new(),
            audio_formats: Vec::new(),
            ..youtube_session()
        }
    }

    #[test]
    fn resolves_video_ladder_selection() {
        let session = youtube_session();
        let event = CallbackEvent::ChooseVideo { format_id: "137+140".to_string() };

        let (selector, label) = resolve_selection(&session, &event).unwrap();
        assert_eq!(selector, FormatSelector::Video { format_id: "137+140".to_string() });
        assert_eq!(label, "1080p");
    }

    #[test]
    fn resolves_audio_ladder_selection() {
        let session = youtube_session();
        let event = CallbackEvent::ChooseAudio { format_id: "251".to_string(), bitrate_kbps: 128 };

        let (selector, label) = resolve_selection(&session, &event).unwrap();
        assert_eq!(
            selector,
            FormatSelector::Audio { format_id: "251".to_string(), bitrate_kbps: 128 }
        );
        assert_eq!(label, "MP3 128kbps");
    }

    #[test]
    fn rejects_selection_not_in_session() {
        let session = youtube_session();

        let unknown_video = CallbackEvent::ChooseVideo { format_id: "22".to_string() };
        assert!(resolve_selection(&session, &unknown_video).is_none());

        let wrong_bitrate = CallbackEvent::ChooseAudio { format_id: "251".to_string(), bitrate_kbps: 999 };
        assert!(resolve_selection(&session, &wrong_bitrate).is_none());
    }

    #[test]
    fn quick_actions_only_apply_without_quality_menu() {
        let tiktok = tiktok_session();
        let (selector, label) = resolve_selection(&tiktok, &CallbackEvent::QuickVideoBest).unwrap();
        assert_eq!(selector, FormatSelector::VideoBest);
        assert_eq!(label, "HD");

        let (selector, _) = resolve_selection(&tiktok, &CallbackEvent::QuickAudioBest).unwrap();
        assert_eq!(
            selector,
            FormatSelector::AudioBest { bitrate_kbps: config::formats::QUICK_AUDIO_BITRATE }
        );

        let youtube = youtube_session();
        assert!(resolve_selection(&youtube, &CallbackEvent::QuickVideoBest).is_none());
        assert!(resolve_selection(&tiktok, &CallbackEvent::SelectVideoMenu).is_none());
    }

    #[test]
    fn navigation_events_never_resolve_to_downloads() {
        let session = youtube_session();

        for event in [CallbackEvent::Back, CallbackEvent::SelectVideoMenu, CallbackEvent::SelectAudioMenu] {
            assert!(resolve_selection(&session, &event).is_none());
        }
    }

    #[test]
    fn overlapping_selections_claim_the_session_once() {
        let store = SessionStore::new();
        store.put(youtube_session());

        // Two presses on the same keyboard race for the session; only the
        // first claim can start a download, the other sees it gone.
        let first = store.take(1);
        let second = store.take(1);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    struct RecordingDelivery {
        calls: Arc<Mutex<Vec<PathBuf>>>,
    }

    #[async_trait]
    impl Delivery for RecordingDelivery {
        async fn deliver_video(&self, path: &Path, _caption: &str) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        async fn deliver_audio(&self, path: &Path, _title: &str, _performer: &str, _caption: &str) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[tokio::test]
    async fn stale_result_is_discarded_and_superseding_session_survives() {
        let store = Arc::new(SessionStore::new());
        // The downloading session was claimed; the user then sent a new link.
        let mut newer = youtube_session();
        newer.title = "newer".to_string();
        store.put(newer);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let guard = GuardedDelivery::new(RecordingDelivery { calls: calls.clone() }, store.clone(), 1);

        guard.deliver_video(Path::new("stale.mp4"), "caption").await.unwrap();

        assert!(guard.was_suppressed());
        assert!(calls.lock().unwrap().is_empty(), "stale file must not be sent");
        assert_eq!(store.get(1).unwrap().title, "newer", "new session must survive");
    }

    #[tokio::test]
    async fn delivery_proceeds_when_nothing_superseded_it() {
        let store = Arc::new(SessionStore::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let guard = GuardedDelivery::new(RecordingDelivery { calls: calls.clone() }, store, 1);

        guard.deliver_audio(Path::new("fresh.mp3"), "t", "p", "caption").await.unwrap();

        assert!(!guard.was_suppressed());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_final_step_discards_the_session() {
        let store = SessionStore::new();
        store.put(youtube_session());

        let result =
            with_session_cleanup(&store, 1, async { Err(AppError::Delivery("edit failed".to_string())) }).await;
        assert!(result.is_err());
        assert!(store.get(1).is_none());

        store.put(youtube_session());
        with_session_cleanup(&store, 1, async { Ok(()) }).await.unwrap();
        assert!(store.get(1).is_some());
    }
}
