//! End-to-end flows through [`Bot::handle`] with a recording transport and,
//! mostly, a fake converter. No pdfium or LibreOffice needed.

use async_trait::async_trait;
use docbot::{
    Bot, BotConfig, BotError, ChatId, ConvertError, ConvertOptions, DocumentConverter, Engines,
    Enhancement, EventPayload, FileRef, InboundEvent, MessageId, Reply, Transport, UserId,
};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Fakes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Text(String),
    Edit(String),
    Document { file_name: String, caption: String },
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text(t) | Sent::Edit(t) => Some(t.clone()),
                Sent::Document { .. } => None,
            })
            .collect()
    }

    fn documents(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Document { file_name, caption } => Some((file_name.clone(), caption.clone())),
                _ => None,
            })
            .collect()
    }

    fn any_text_contains(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, _chat: ChatId, reply: Reply) -> Result<MessageId, BotError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Text(reply.text));
        Ok(MessageId(sent.len() as i64))
    }

    async fn edit_text(&self, _chat: ChatId, _message: MessageId, reply: Reply) -> Result<(), BotError> {
        self.sent.lock().unwrap().push(Sent::Edit(reply.text));
        Ok(())
    }

    async fn send_document(
        &self,
        _chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), BotError> {
        assert!(path.exists(), "delivered file must exist: {}", path.display());
        self.sent.lock().unwrap().push(Sent::Document {
            file_name: file_name.into(),
            caption: caption.into(),
        });
        Ok(())
    }

    async fn download(&self, file: &FileRef, dest: &Path) -> Result<(), BotError> {
        tokio::fs::copy(&file.file_id, dest)
            .await
            .map(|_| ())
            .map_err(|e| BotError::Download {
                file_id: file.file_id.clone(),
                reason: e.to_string(),
            })
    }
}

#[derive(Default)]
struct FakeConverter {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl FakeConverter {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ConvertError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConvertError::Compose("forced failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn images_to_pdf(
        &self,
        images: &[PathBuf],
        output: &Path,
        options: ConvertOptions,
    ) -> Result<usize, ConvertError> {
        self.record(format!("images_to_pdf:{}:{}", images.len(), options.quality))?;
        std::fs::write(output, b"%PDF-1.7 fake").unwrap();
        Ok(images.len())
    }

    async fn pdf_to_images(
        &self,
        pdf: &Path,
        output: &Path,
        _options: ConvertOptions,
    ) -> Result<usize, ConvertError> {
        self.record(format!("pdf_to_images:{}", pdf.display()))?;
        std::fs::write(output, b"PK fake").unwrap();
        Ok(1)
    }

    async fn office_to_pdf(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        self.record(format!("office_to_pdf:{}", input.display()))?;
        std::fs::write(output, b"%PDF-1.7 fake").unwrap();
        Ok(())
    }

    async fn enhance_image(&self, image: &Path, enhancement: Enhancement) -> Result<PathBuf, ConvertError> {
        self.record(format!("enhance:{enhancement}"))?;
        let out = image.with_file_name(format!(
            "{}_enh_{enhancement}.jpg",
            image.file_stem().unwrap().to_string_lossy()
        ));
        std::fs::copy(image, &out).unwrap();
        Ok(out)
    }

    async fn extract_text(&self, pdf: &Path) -> Result<String, ConvertError> {
        self.record(format!("extract_text:{}", pdf.display()))?;
        Ok("Hello from page one".into())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

const USER: UserId = UserId(7);
const CHAT: ChatId = ChatId(7);

struct Harness {
    bot: Bot,
    transport: Arc<RecordingTransport>,
    converter: Arc<FakeConverter>,
    inbox: TempDir,
    _work: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with(|b| b)
    }

    fn with(tweak: impl FnOnce(docbot::BotConfigBuilder) -> docbot::BotConfigBuilder) -> Self {
        let work = tempfile::tempdir().unwrap();
        let config = tweak(BotConfig::builder().work_dir(work.path())).build().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let converter = Arc::new(FakeConverter::default());
        let bot = Bot::new(config, transport.clone(), converter.clone());
        Self {
            bot,
            transport,
            converter,
            inbox: tempfile::tempdir().unwrap(),
            _work: work,
        }
    }

    async fn send(&self, payload: EventPayload) {
        self.bot
            .handle(InboundEvent {
                user: USER,
                chat: CHAT,
                first_name: Some("Ada".into()),
                payload,
            })
            .await;
    }

    async fn text(&self, text: &str) {
        self.send(EventPayload::Text { text: text.into() }).await;
    }

    async fn click(&self, data: &str) {
        self.send(EventPayload::Callback {
            data: data.into(),
            message_id: MessageId(1),
        })
        .await;
    }

    fn inbox_file(&self, name: &str, bytes: &[u8]) -> FileRef {
        let path = self.inbox.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        FileRef {
            file_id: path.display().to_string(),
            file_name: Some(name.into()),
            mime_type: None,
            file_size: Some(bytes.len() as u64),
        }
    }

    async fn photo(&self, n: usize) {
        let mut file = self.inbox_file(&format!("photo{n}.jpg"), b"jpeg bytes");
        file.file_name = None;
        self.send(EventPayload::Photo(file)).await;
    }

    async fn document(&self, name: &str, mime: &str, bytes: &[u8]) {
        let mut file = self.inbox_file(name, bytes);
        file.mime_type = Some(mime.into());
        self.send(EventPayload::Document(file)).await;
    }

    async fn session(&self) -> docbot::Session {
        self.bot.sessions().get(USER).await.expect("session exists")
    }
}

// ── Flows ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_images_convert_to_pdf() {
    let h = Harness::new();
    for n in 1..=3 {
        h.photo(n).await;
    }
    let s = h.session().await;
    assert_eq!(s.images.len(), 3);
    assert_eq!(s.files_processed, 3);
    assert!(s.images.iter().all(|p| p.exists()));
    let names: Vec<String> = s
        .images
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    for (i, name) in names.iter().enumerate() {
        assert!(name.starts_with(&format!("img_{}_", i + 1)), "upload order lost: {names:?}");
    }
    assert!(h.transport.any_text_contains("(3/50 total)"));

    h.click("convert_images_pdf").await;

    let s = h.session().await;
    assert!(s.images.is_empty());
    assert_eq!(s.conversions, 1);
    assert!(s.intent().is_none());
    assert_eq!(h.converter.calls(), vec!["images_to_pdf:3:medium".to_string()]);

    let docs = h.transport.documents();
    assert_eq!(docs.len(), 1);
    assert!(docs[0].0.starts_with("converted_") && docs[0].0.ends_with(".pdf"), "{docs:?}");
    assert!(h.transport.any_text_contains("Conversion completed"));
}

#[tokio::test]
async fn custom_name_flow_runs_named_conversion() {
    let h = Harness::new();
    h.photo(1).await;
    h.click("custom_name_images_pdf").await;

    let s = h.session().await;
    assert!(s.dialogue.is_waiting());
    assert_eq!(s.pending_conversion, Some(docbot::ConversionType::ImagesPdf));
    assert!(h.transport.any_text_contains("Custom Filename"));

    h.text("My Report").await;

    let s = h.session().await;
    assert!(!s.dialogue.is_waiting());
    assert!(s.pending_conversion.is_none());
    assert!(s.custom_filename.is_none(), "cleared after a successful send");
    assert!(s.images.is_empty());
    assert_eq!(s.conversions, 1);
    assert!(h.transport.any_text_contains("Custom filename set: My_Report"));
    assert_eq!(h.transport.documents()[0].0, "My_Report.pdf");
}

#[tokio::test]
async fn all_invalid_name_is_rejected_and_prompt_stays() {
    let h = Harness::new();
    h.photo(1).await;
    h.click("custom_name_images_pdf").await;
    h.text("###").await;

    let s = h.session().await;
    assert!(s.dialogue.is_waiting());
    assert!(s.custom_filename.is_none());
    assert!(h.transport.any_text_contains("Invalid filename"));
    assert!(h.converter.calls().is_empty());
}

#[tokio::test]
async fn cancel_leaves_dialogue_without_intent() {
    let h = Harness::new();
    h.photo(1).await;
    h.click("custom_name_images_pdf").await;
    h.text("/cancel").await;

    let s = h.session().await;
    assert!(!s.dialogue.is_waiting());
    assert!(s.pending_conversion.is_none());
    assert!(s.intent().is_none());
    assert_eq!(s.images.len(), 1);
    assert!(h.transport.any_text_contains("Custom naming cancelled"));
}

#[tokio::test]
async fn other_events_while_naming_get_a_reminder() {
    let h = Harness::new();
    h.photo(1).await;
    h.click("custom_name_images_pdf").await;
    h.click("convert_images_pdf").await;

    let s = h.session().await;
    assert!(s.dialogue.is_waiting());
    assert!(s.intent().is_none());
    assert!(h.converter.calls().is_empty());
    assert!(h.transport.any_text_contains("waiting for a filename"));
}

#[tokio::test]
async fn naming_times_out_lazily() {
    let h = Harness::with(|b| b.naming_timeout(Duration::from_millis(20)));
    h.photo(1).await;
    h.click("custom_name_images_pdf").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    h.text("Late Name").await;

    let s = h.session().await;
    assert!(!s.dialogue.is_waiting());
    assert!(s.pending_conversion.is_none());
    assert!(s.custom_filename.is_none());
    assert!(h.transport.any_text_contains("timed out"));
    assert!(h.converter.calls().is_empty());
}

#[tokio::test]
async fn grayscale_with_no_images_skips_converter() {
    let h = Harness::new();
    h.click("enhance_grayscale").await;

    assert!(h.transport.any_text_contains("No images to enhance"));
    assert!(h.converter.calls().is_empty());
    assert!(h.session().await.intent().is_none());
}

#[tokio::test]
async fn enhancement_replaces_queue_paths_in_order() {
    let h = Harness::new();
    h.photo(1).await;
    h.photo(2).await;
    let before = h.session().await.images;

    h.click("enhance_contrast").await;

    let after = h.session().await.images;
    assert_eq!(after.len(), 2);
    for (old, new) in before.iter().zip(&after) {
        let old_stem = old.file_stem().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            new.file_name().unwrap().to_string_lossy(),
            format!("{old_stem}_enh_contrast.jpg")
        );
    }
    assert!(h.transport.any_text_contains("Contrast enhancement applied to 2 images"));
}

#[tokio::test]
async fn upload_beyond_cap_warns_and_still_appends() {
    let h = Harness::with(|b| b.max_images_per_pdf(2));
    for n in 1..=3 {
        h.photo(n).await;
    }
    assert_eq!(h.session().await.images.len(), 3);
    let warnings = h
        .transport
        .texts()
        .iter()
        .filter(|t| t.contains("Maximum 2 images reached"))
        .count();
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_download() {
    let h = Harness::with(|b| b.max_file_size(1024 * 1024));
    let mut file = h.inbox_file("huge.pdf", b"%PDF-1.7");
    file.mime_type = Some("application/pdf".into());
    file.file_size = Some(5 * 1024 * 1024);
    h.send(EventPayload::Document(file)).await;

    assert!(h.transport.any_text_contains("File too large! Maximum size is 1 MB."));
    let s = h.session().await;
    assert!(s.current_pdf.is_none());
    assert_eq!(s.files_processed, 0);
}

#[tokio::test]
async fn invalid_pdf_is_deleted_when_validation_is_on() {
    let h = Harness::with(|b| b.validate_files(true));
    h.document("fake.pdf", "application/pdf", b"not a pdf").await;

    assert!(h.transport.any_text_contains("Invalid PDF file"));
    let s = h.session().await;
    assert!(s.current_pdf.is_none());
    let user_dir = h.bot.config().work_dir.join(USER.to_string());
    assert!(!user_dir.join("fake.pdf").exists());
}

#[tokio::test]
async fn unsupported_document_gets_a_hint_and_changes_nothing() {
    let h = Harness::new();
    h.document("song.mp3", "audio/mpeg", b"ID3").await;

    assert!(h.transport.any_text_contains("not directly supported"));
    assert!(!h.transport.any_text_contains("An error occurred"));
    let s = h.session().await;
    assert_eq!(s.files_processed, 0);
    assert!(s.images.is_empty());
    assert!(s.current_pdf.is_none());
}

#[tokio::test]
async fn unknown_payload_gets_generic_message() {
    let h = Harness::new();
    h.click("launch_rockets").await;
    assert!(h.transport.any_text_contains("Unknown option"));
    assert!(h.converter.calls().is_empty());
}

#[tokio::test]
async fn failed_conversion_keeps_queue_for_retry() {
    let h = Harness::new();
    h.photo(1).await;
    h.photo(2).await;
    h.converter.fail.store(true, Ordering::SeqCst);
    h.click("convert_images_pdf").await;

    let s = h.session().await;
    assert_eq!(s.images.len(), 2);
    assert_eq!(s.conversions, 0);
    assert!(s.intent().is_none(), "intent consumed even on failure");
    assert!(h.transport.any_text_contains("Conversion failed"));
    assert!(h.transport.documents().is_empty());
}

#[tokio::test]
async fn plain_retry_after_failed_named_conversion_keeps_the_name() {
    let h = Harness::new();
    h.photo(1).await;
    h.converter.fail.store(true, Ordering::SeqCst);
    h.click("custom_name_images_pdf").await;
    h.text("Q3 Summary").await;

    let s = h.session().await;
    assert_eq!(s.custom_filename.as_deref(), Some("Q3_Summary"));
    assert_eq!(s.images.len(), 1);
    assert!(h.transport.documents().is_empty());

    h.converter.fail.store(false, Ordering::SeqCst);
    h.click("convert_images_pdf").await;

    assert_eq!(h.transport.documents()[0].0, "Q3_Summary.pdf");
    let s = h.session().await;
    assert!(s.custom_filename.is_none());
    assert_eq!(s.conversions, 1);
}

#[tokio::test]
async fn unsized_upload_over_the_limit_is_removed_after_download() {
    let h = Harness::with(|b| b.max_file_size(16));
    let mut file = h.inbox_file("big.jpg", &[0xFF; 64]);
    file.file_name = None;
    file.file_size = None;
    h.send(EventPayload::Photo(file)).await;

    assert!(h.transport.any_text_contains("File too large!"));
    let s = h.session().await;
    assert!(s.images.is_empty());
    assert_eq!(s.files_processed, 0);
    let user_dir = h.bot.config().work_dir.join(USER.to_string());
    let leftovers = std::fs::read_dir(&user_dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0, "downloaded file must be deleted");
}

#[tokio::test]
async fn same_stem_images_keep_distinct_enhanced_paths() {
    let work = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    let config = BotConfig::builder().work_dir(work.path()).build().unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let engines = Arc::new(Engines::new(&config));
    let bot = Bot::new(config, transport.clone(), engines);

    let event = |payload| InboundEvent {
        user: USER,
        chat: CHAT,
        first_name: None,
        payload,
    };
    for (name, mime, colour) in [("a.jpg", "image/jpeg", [200, 0, 0]), ("a.png", "image/png", [0, 0, 200])] {
        let path = inbox.path().join(name);
        RgbImage::from_pixel(16, 16, Rgb(colour)).save(&path).unwrap();
        let file = FileRef {
            file_id: path.display().to_string(),
            file_name: Some(name.into()),
            mime_type: Some(mime.into()),
            file_size: None,
        };
        bot.handle(event(EventPayload::Document(file))).await;
    }
    let before = bot.sessions().get(USER).await.unwrap().images;
    assert_eq!(before.len(), 2);

    bot.handle(event(EventPayload::Callback {
        data: "enhance_brightness".into(),
        message_id: MessageId(1),
    }))
    .await;

    let after = bot.sessions().get(USER).await.unwrap().images;
    assert_eq!(after.len(), 2);
    assert_ne!(after[0], after[1]);
    assert!(after.iter().all(|p| p.exists()));
    assert!(before.iter().all(|p| !after.contains(p)), "{before:?} -> {after:?}");

    // Each slot still holds its own image, in upload order.
    let red = image::open(&after[0]).unwrap().to_rgb8().get_pixel(8, 8).0;
    let blue = image::open(&after[1]).unwrap().to_rgb8().get_pixel(8, 8).0;
    assert!(red[0] > red[2], "first slot: {red:?}");
    assert!(blue[2] > blue[0], "second slot: {blue:?}");
    assert!(transport.any_text_contains("Brightness enhancement applied to 2 images"));
}

#[tokio::test]
async fn pdf_upload_info_and_conversion() {
    let h = Harness::new();
    h.document("report.pdf", "application/pdf", b"%PDF-1.7 body").await;
    assert!(h.transport.any_text_contains("PDF received"));

    h.click("pdf_info").await;
    assert!(h.transport.any_text_contains("📄 PDF: report.pdf\nSize: 0.00 MB"));

    h.click("convert_pdf_images").await;
    assert_eq!(h.transport.documents()[0].0, "report_pages.zip");
    let s = h.session().await;
    assert!(s.current_pdf.is_none());
    assert_eq!(s.conversions, 1);
}

#[tokio::test]
async fn word_document_converts_through_office() {
    let h = Harness::new();
    h.document(
        "Budget 2026.docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        b"PK docx",
    )
    .await;
    h.click("convert_word_pdf").await;

    let calls = h.converter.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("office_to_pdf:") && calls[0].ends_with("Budget_2026.docx"));
    assert_eq!(h.transport.documents()[0].0, "Budget_2026.pdf");
}

#[tokio::test]
async fn extract_text_sends_txt_document() {
    let h = Harness::new();
    h.document("notes.pdf", "application/pdf", b"%PDF-1.4").await;
    h.click("extract_text").await;

    let docs = h.transport.documents();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].0, "notes.txt");
    assert!(docs[0].1.contains("19 characters"));
    assert!(h.session().await.current_pdf.is_some(), "extraction keeps the PDF");
}

#[tokio::test]
async fn auto_enhance_composes_enhanced_copies() {
    let h = Harness::with(|b| b.auto_enhance_default(true));
    h.photo(1).await;
    let original = h.session().await.images[0].clone();
    h.click("convert_images_pdf").await;

    assert_eq!(
        h.converter.calls(),
        vec!["enhance:auto_enhance".to_string(), "images_to_pdf:1:medium".to_string()]
    );
    assert!(original.exists(), "originals are never replaced by auto-enhance");
}

#[tokio::test]
async fn settings_apply_immediately() {
    let h = Harness::new();
    h.click("quality_high").await;
    h.click("format_JPEG").await;
    h.click("setting_auto_enhance").await;

    let s = h.session().await;
    assert_eq!(s.settings.quality, docbot::Quality::High);
    assert_eq!(s.settings.format, docbot::OutputFormat::Jpeg);
    assert!(s.settings.auto_enhance);
    assert!(s.intent().is_none());
    assert!(h.transport.any_text_contains("Quality set to High"));
}

#[tokio::test]
async fn clear_keeps_counters_and_settings() {
    let h = Harness::new();
    h.photo(1).await;
    h.click("quality_ultra").await;
    h.transport.clear();
    h.text("/clear").await;

    let s = h.session().await;
    assert!(s.images.is_empty());
    assert_eq!(s.files_processed, 1);
    assert_eq!(s.settings.quality, docbot::Quality::Ultra);
    assert_eq!(h.transport.texts(), vec!["🧹 Session cleared! Ready for new conversions!".to_string()]);
}

#[test]
fn start_and_unknown_command_on_a_plain_runtime() {
    let h = Harness::new();
    tokio_test::block_on(async {
        h.text("/start").await;
        h.text("/frobnicate").await;
    });
    let texts = h.transport.texts();
    assert!(texts[0].contains("Welcome Ada!"));
    assert!(texts[1].contains("Unknown command /frobnicate"));
    assert!(tokio_test::block_on(h.bot.sessions().get(USER)).is_some());
}

#[tokio::test]
async fn concurrent_clicks_from_one_user_run_one_at_a_time() {
    let h = Arc::new(Harness::new());
    h.photo(1).await;
    h.photo(2).await;

    let a = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.click("convert_images_pdf").await })
    };
    let b = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.click("convert_images_pdf").await })
    };
    tokio_test::assert_ok!(a.await);
    tokio_test::assert_ok!(b.await);

    let s = h.session().await;
    assert_eq!(s.conversions, 1, "second click finds an empty queue");
    assert!(h.transport.any_text_contains("No images found"));
}
