//! The image uploader: turns triggers into upload tasks and drives each task
//! through preview → upload → reconcile.
//!
//! # Task lifecycle
//!
//! Every intake spawns one tokio task that owns a [`PendingUpload`]:
//!
//! 1. Focus the document and capture the selection.
//! 2. Start reading the file as a `data:` URI and start the configured upload,
//!    polling both together.
//! 3. If the read finishes first, insert the preview at the captured index.
//! 4. When the upload settles, reconcile: on success delete the preview and
//!    insert the final image (caret moves past it); on failure delete the
//!    preview only.
//!
//! If the upload settles before the read, the read is dropped: the preview is
//! known never to be inserted and reconciliation deletes nothing. This is what
//! keeps a failed upload from leaving an orphaned preview behind.
//!
//! While several tasks are in flight, each change one of them applies moves
//! the captured ranges of the others (see [`LiveRanges`]).
//!
//! Nothing a task does escapes as an error. Each task resolves to an
//! [`UploadOutcome`], and failures are logged.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::future::BoxFuture;
use imgdrop_protocol::EmbedFormat;
use imgdrop_protocol::FormatRegistry;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;
use tokio::task::JoinHandle;

use crate::engine::DocumentEngine;
use crate::engine::PointerPosition;
use crate::error::UploadError;
use crate::file::ImageFile;
use crate::file::read_as_data_uri;
use crate::live_ranges::LiveRanges;
use crate::live_ranges::Tracked;
use crate::options::ImageUploaderOptions;
use crate::options::UploadFn;
use crate::pending::PendingUpload;
use crate::triggers::ClipboardEntry;
use crate::triggers::FilePicker;
use crate::triggers::IMAGE_ACCEPT;
use crate::triggers::PasteHandling;
use crate::triggers::first_pasteable_image;

/// How an upload task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The preview was replaced by the uploaded image; `selection` is the caret after it.
    Inserted {
        url: String,
        selection: SelectionRange,
    },
    /// The upload succeeded but no selection was captured, so nothing was inserted.
    UploadedWithoutSelection { url: String },
    /// The upload failed; `removed` preview units were deleted.
    Failed { reason: String, removed: usize },
    /// The file picker was dismissed.
    Cancelled,
}

/// Handle to a spawned upload task.
#[derive(Debug)]
pub struct UploadHandle {
    id: u64,
    join: JoinHandle<UploadOutcome>,
}

impl UploadHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the task to settle.
    pub async fn outcome(self) -> UploadOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => {
                let err = UploadError::TaskAborted(err.to_string());
                tracing::warn!(task_id = self.id, "{err}");
                UploadOutcome::Failed {
                    reason: err.to_string(),
                    removed: 0,
                }
            }
        }
    }
}

#[derive(Debug)]
struct TaskStatus {
    settled: AtomicBool,
}

type LatestStatus = Arc<Mutex<Option<Arc<TaskStatus>>>>;

/// Everything a spawned task needs, moved into it by value.
struct TaskContext<E> {
    id: u64,
    engine: Arc<Mutex<E>>,
    live: Arc<Mutex<LiveRanges>>,
    latest: LatestStatus,
    upload: Option<UploadFn>,
    status: Arc<TaskStatus>,
}

impl<E> TaskContext<E>
where
    E: DocumentEngine,
{
    /// Makes this task the one [`ImageUploader::has_pending_upload`] reports on.
    fn announce(&self) {
        *lock(&self.latest) = Some(Arc::clone(&self.status));
    }

    /// Focuses the document and captures its selection. A captured range is
    /// registered as live so other tasks' changes shift it.
    fn capture_selection(&self) -> Option<SelectionRange> {
        let mut engine = lock(&self.engine);
        engine.focus();
        let range = engine.get_selection();
        if let Some(range) = range {
            lock(&self.live).insert(self.id, range);
        }
        range
    }

    /// Runs `f` with the engine locked and `pending`'s range brought up to
    /// date with the changes other tasks made since this task last ran.
    fn reconcile<R>(
        &self,
        pending: &mut PendingUpload,
        f: impl FnOnce(&mut PendingUpload, &mut Tracked<'_, E>) -> R,
    ) -> R {
        let mut engine = lock(&self.engine);
        let mut live = lock(&self.live);
        if let Some(range) = live.get(self.id) {
            pending.captured_range = Some(range);
        }
        let result = f(
            pending,
            &mut Tracked {
                engine: &mut *engine,
                live: &mut *live,
                task_id: self.id,
            },
        );
        match pending.captured_range {
            Some(range) if !pending.settled => live.insert(self.id, range),
            _ => live.remove(self.id),
        }
        result
    }

    fn finish(&self, outcome: UploadOutcome) -> UploadOutcome {
        lock(&self.live).remove(self.id);
        self.status.settled.store(true, Ordering::Release);
        outcome
    }
}

pub struct ImageUploader<E> {
    engine: Arc<Mutex<E>>,
    picker: Arc<dyn FilePicker>,
    upload: Option<UploadFn>,
    /// Cleared by [`ImageUploader::destroy`]; drop and paste triggers check it.
    listening: AtomicBool,
    next_task_id: AtomicU64,
    /// Captured ranges of unsettled uploads, keyed by task id.
    live: Arc<Mutex<LiveRanges>>,
    /// Status of the most recently started upload only.
    latest: LatestStatus,
}

impl<E> ImageUploader<E>
where
    E: DocumentEngine + Send + 'static,
{
    pub fn new(
        engine: Arc<Mutex<E>>,
        picker: Arc<dyn FilePicker>,
        options: ImageUploaderOptions,
    ) -> Self {
        if options.upload.is_none() {
            tracing::warn!("{}", UploadError::MissingUploadFn);
        }
        Self {
            engine,
            picker,
            upload: options.upload,
            listening: AtomicBool::new(true),
            next_task_id: AtomicU64::new(1),
            live: Arc::new(Mutex::new(LiveRanges::default())),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn engine(&self) -> &Arc<Mutex<E>> {
        &self.engine
    }

    /// Toolbar action: capture the selection now, then ask the picker for a
    /// file. The upload only counts as pending once a file was picked.
    pub fn trigger_manual_selection(&self) -> UploadHandle {
        let ctx = self.new_task();
        let captured_range = ctx.capture_selection();
        let picker = Arc::clone(&self.picker);
        let id = ctx.id;
        self.spawn(id, async move {
            let Some(file) = picker.pick(IMAGE_ACCEPT).await else {
                tracing::debug!(task_id = ctx.id, "file picker dismissed");
                return ctx.finish(UploadOutcome::Cancelled);
            };
            ctx.announce();
            run_upload(ctx, file, captured_range).await
        })
    }

    /// Drop action: place the caret under the pointer, then intake the first
    /// file once the position has settled. Drops without files are ignored.
    pub fn trigger_from_drop(
        &self,
        files: Vec<ImageFile>,
        pointer: PointerPosition,
    ) -> Option<UploadHandle> {
        if !self.is_listening() {
            return None;
        }
        let file = files.into_iter().next()?;
        with_engine(&self.engine, |engine| {
            if let Some(index) = engine.index_from_point(pointer) {
                engine.set_selection(SelectionRange::caret(index), Source::User);
            }
        });
        Some(self.spawn_deferred_intake(file))
    }

    /// Paste action: intercept the first pasteable image entry. Anything else
    /// is left to the host's default paste handling.
    pub fn trigger_from_paste(&self, entries: &[ClipboardEntry]) -> PasteHandling {
        if !self.is_listening() {
            return PasteHandling::Default;
        }
        match first_pasteable_image(entries) {
            Some(file) => PasteHandling::Intercepted(self.spawn_deferred_intake(file)),
            None => PasteHandling::Default,
        }
    }

    /// Captures the current selection and starts the preview/upload task for `file`.
    pub fn intake_file(&self, file: ImageFile) -> UploadHandle {
        let ctx = self.new_task();
        ctx.announce();
        let captured_range = ctx.capture_selection();
        let id = ctx.id;
        self.spawn(id, run_upload(ctx, file, captured_range))
    }

    /// Detaches the drop and paste triggers. Document content and uploads
    /// already in flight are left alone.
    pub fn destroy(&self) {
        self.listening.store(false, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Whether the most recently started upload is still unsettled. Earlier
    /// uploads are not tracked here once a newer one starts.
    pub fn has_pending_upload(&self) -> bool {
        lock(&self.latest)
            .as_ref()
            .is_some_and(|status| !status.settled.load(Ordering::Acquire))
    }

    fn spawn_deferred_intake(&self, file: ImageFile) -> UploadHandle {
        let ctx = self.new_task();
        ctx.announce();
        let id = ctx.id;
        self.spawn(id, async move {
            // Let the engine finish applying the selection before reading it back.
            tokio::task::yield_now().await;
            let captured_range = ctx.capture_selection();
            run_upload(ctx, file, captured_range).await
        })
    }

    fn new_task(&self) -> TaskContext<E> {
        TaskContext {
            id: self.next_task_id.fetch_add(1, Ordering::Relaxed),
            engine: Arc::clone(&self.engine),
            live: Arc::clone(&self.live),
            latest: Arc::clone(&self.latest),
            upload: self.upload.clone(),
            status: Arc::new(TaskStatus {
                settled: AtomicBool::new(false),
            }),
        }
    }

    fn spawn<Fut>(&self, id: u64, task: Fut) -> UploadHandle
    where
        Fut: std::future::Future<Output = UploadOutcome> + Send + 'static,
    {
        UploadHandle {
            id,
            join: tokio::spawn(task),
        }
    }
}

/// Registers the preview embed format so the engine accepts previews. Call
/// once before constructing any [`ImageUploader`] for the registry's engine.
pub fn register_formats(registry: &mut FormatRegistry) {
    if registry.register(EmbedFormat::ImagePreview) {
        tracing::debug!("registered {} embed format", EmbedFormat::ImagePreview.name());
    }
}

enum FirstSettled {
    Upload(Result<String, UploadError>),
    Read(Result<String, UploadError>),
}

async fn run_upload<E>(
    ctx: TaskContext<E>,
    file: ImageFile,
    captured_range: Option<SelectionRange>,
) -> UploadOutcome
where
    E: DocumentEngine,
{
    if captured_range.is_none() {
        tracing::debug!(task_id = ctx.id, "no selection; uploading without placement");
    }
    let mut pending = PendingUpload::new(captured_range);

    let mut upload: BoxFuture<'static, Result<String, UploadError>> = match &ctx.upload {
        Some(upload) => upload(file.clone())
            .map(|result| result.map_err(UploadError::Rejected))
            .boxed(),
        None => futures::future::ready(Err(UploadError::MissingUploadFn)).boxed(),
    };
    let read = read_as_data_uri(&file);
    tokio::pin!(read);

    let first = tokio::select! {
        biased;
        result = &mut upload => FirstSettled::Upload(result),
        result = &mut read => FirstSettled::Read(result),
    };
    let result = match first {
        FirstSettled::Upload(result) => result,
        FirstSettled::Read(Ok(src)) => {
            ctx.reconcile(&mut pending, |pending, engine| {
                pending.insert_preview(engine, src)
            });
            upload.await
        }
        FirstSettled::Read(Err(err)) => {
            tracing::debug!(task_id = ctx.id, "showing no preview: {err}");
            upload.await
        }
    };

    let outcome = match result {
        Ok(url) => {
            match ctx.reconcile(&mut pending, |pending, engine| {
                pending.complete(engine, url.clone())
            }) {
                Some(selection) => {
                    tracing::info!(task_id = ctx.id, "inserted uploaded image {url}");
                    UploadOutcome::Inserted { url, selection }
                }
                None => UploadOutcome::UploadedWithoutSelection { url },
            }
        }
        Err(err) => {
            let removed = ctx.reconcile(&mut pending, |pending, engine| pending.fail(engine));
            tracing::warn!(task_id = ctx.id, "image upload failed: {err}");
            UploadOutcome::Failed {
                reason: err.to_string(),
                removed,
            }
        }
    };
    ctx.finish(outcome)
}

fn with_engine<E, R>(engine: &Mutex<E>, f: impl FnOnce(&mut E) -> R) -> R {
    f(&mut lock(engine))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
