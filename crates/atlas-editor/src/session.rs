//! Editor session bound to the shared surface.
//!
//! The session owns the surface, the completion provider registrations and
//! the popup layer. It binds one buffer at a time: binding detaches the
//! previous buffer's change listener before attaching a new one, so edits
//! never leak across buffers. Edits observed for the bound buffer are applied
//! by [`EditorSession::sync`], and by any rebind or unbind before the
//! listener is detached.

#![allow(missing_docs)]

use crossbeam_channel::Receiver;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::buffer::{BufferId, BufferRegistry};
use crate::completion::{CompletionItem, CompletionQuery, CompletionRegistry};
use crate::error::{EditorError, RemoteError};
use crate::popup::{NestedKind, PointerTarget, PopupContent, PopupCoordinator, PopupId};
use crate::rectify::{RectifyPhase, RectifyPopup, RectifyRequest};
use crate::remote::RemoteFiles;
use crate::save::{SaveQueue, SaveRequest};
use crate::surface::{ContentChanged, EditorSurface, ListenerId};
use crate::text::{self, Position, TextRange};

#[derive(Debug)]
struct Binding {
    buffer: BufferId,
    listener: ListenerId,
    changes: Receiver<ContentChanged>,
}

/// Rectification progress as seen from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectifyState {
    Idle,
    PopupOpen,
    Rectifying,
}

/// Owner of the shared editor surface.
#[derive(Debug)]
pub struct EditorSession<S: EditorSurface> {
    surface: S,
    binding: Option<Binding>,
    completions: CompletionRegistry,
    autocompletion: bool,
    popups: PopupCoordinator,
}

impl<S: EditorSurface> EditorSession<S> {
    pub fn new(surface: S, autocompletion: bool) -> Self {
        Self {
            surface,
            binding: None,
            completions: CompletionRegistry::default(),
            autocompletion,
            popups: PopupCoordinator::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct surface access, e.g. for a host forwarding widget events.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Buffer currently shown on the surface.
    pub fn bound(&self) -> Option<BufferId> {
        self.binding.as_ref().map(|binding| binding.buffer)
    }

    /// Shows `id` on the surface and starts listening for its edits.
    ///
    /// Edits still pending for the previously bound buffer are applied first.
    pub fn bind(
        &mut self,
        registry: &mut BufferRegistry,
        saves: &SaveQueue,
        id: BufferId,
    ) -> Result<(), EditorError> {
        let language = registry
            .get(id)
            .map(|buffer| buffer.language().to_string())
            .ok_or_else(|| EditorError::NotFound(id.to_string()))?;
        if self.bound() == Some(id) && self.surface.language() == language {
            return Ok(());
        }
        self.unbind(registry, saves);
        let buffer = registry
            .get(id)
            .ok_or_else(|| EditorError::NotFound(id.to_string()))?;
        self.surface.set_document(buffer.language(), buffer.content());
        let (listener, changes) = self.surface.subscribe();
        self.binding = Some(Binding {
            buffer: id,
            listener,
            changes,
        });
        debug!("bound buffer {id} ('{}')", buffer.path());
        if self.autocompletion {
            self.completions.register(&mut self.surface, buffer.language());
        }
        Ok(())
    }

    /// Applies pending edits, then detaches the bound buffer's listener.
    ///
    /// A rectify popup opened on that buffer is discarded.
    pub fn unbind(&mut self, registry: &mut BufferRegistry, saves: &SaveQueue) {
        self.apply_changes(registry, saves);
        let Some(binding) = self.binding.take() else {
            return;
        };
        self.surface.unsubscribe(binding.listener);
        let stale = self
            .popups
            .rectify()
            .filter(|(_, rectify)| rectify.buffer() == binding.buffer)
            .map(|(popup, _)| popup);
        if let Some(popup) = stale {
            self.popups.close(popup);
        }
        debug!("unbound buffer {}", binding.buffer);
    }

    /// Applies observed edits to the bound buffer and schedules their saves.
    ///
    /// Also folds save acknowledgements back into the buffers. Returns the
    /// number of edits applied.
    pub fn sync(&mut self, registry: &mut BufferRegistry, saves: &SaveQueue) -> usize {
        let applied = self.apply_changes(registry, saves);
        for outcome in saves.drain_outcomes() {
            if outcome.result.is_err() {
                continue;
            }
            if let Some(buffer) = registry.get_mut(outcome.buffer) {
                buffer.acknowledge_save(outcome.revision);
            }
        }
        applied
    }

    fn apply_changes(&self, registry: &mut BufferRegistry, saves: &SaveQueue) -> usize {
        let Some(binding) = &self.binding else {
            return 0;
        };
        let mut applied = 0;
        for change in binding.changes.try_iter() {
            let Some(buffer) = registry.get_mut(binding.buffer) else {
                break;
            };
            let revision = buffer.record_edit(change.content);
            saves.schedule(SaveRequest {
                buffer: buffer.id(),
                path: buffer.path().to_string(),
                content: buffer.content().to_string(),
                revision,
            });
            applied += 1;
        }
        applied
    }

    /// Replaces `range` of the bound buffer's text.
    pub fn edit(&mut self, range: TextRange, text: &str) -> Result<(), EditorError> {
        if self.binding.is_none() {
            return Err(EditorError::NoActiveBuffer);
        }
        self.surface.apply_edit(range, text)
    }

    pub fn autocompletion(&self) -> bool {
        self.autocompletion
    }

    /// Turns AI completion on or off.
    ///
    /// Enabling registers one provider per language in use; disabling
    /// disposes every provider.
    pub fn set_autocompletion(&mut self, enabled: bool, registry: &BufferRegistry) {
        self.autocompletion = enabled;
        if enabled {
            self.sync_providers(registry);
        } else {
            self.completions.clear(&mut self.surface);
            debug!("autocompletion disabled, providers cleared");
        }
    }

    /// Keeps exactly one provider per language among the open buffers.
    pub fn sync_providers(&mut self, registry: &BufferRegistry) {
        if !self.autocompletion {
            return;
        }
        let in_use: FxHashSet<&str> = registry.iter().map(|buffer| buffer.language()).collect();
        self.completions
            .retain_languages(&mut self.surface, &in_use);
        for language in in_use {
            if !self.completions.is_registered(language) {
                self.completions.register(&mut self.surface, language);
            }
        }
    }

    pub fn completions(&self) -> &CompletionRegistry {
        &self.completions
    }

    /// Invokes the provider of the bound buffer's language at `cursor`.
    ///
    /// Without a registered provider nothing is requested.
    pub fn complete(
        &self,
        registry: &BufferRegistry,
        remote: &dyn RemoteFiles,
        cursor: Position,
    ) -> Result<Vec<CompletionItem>, EditorError> {
        let id = self.bound().ok_or(EditorError::NoActiveBuffer)?;
        let buffer = registry
            .get(id)
            .ok_or_else(|| EditorError::NotFound(id.to_string()))?;
        if !self.completions.is_registered(buffer.language()) {
            return Ok(Vec::new());
        }
        let query = CompletionQuery::at(self.surface.content(), buffer.language(), cursor)?;
        Ok(query.run(remote)?)
    }

    /// Selects `range`; a non-empty selection opens the rectify popup.
    pub fn select(&mut self, range: TextRange) -> Result<Option<PopupId>, EditorError> {
        let id = self.bound().ok_or(EditorError::NoActiveBuffer)?;
        self.surface.set_selection(range)?;
        if range.is_empty() {
            return Ok(None);
        }
        let selected = text::text_in_range(self.surface.content(), range)
            .ok_or(EditorError::InvalidRange)?
            .to_string();
        let popup = RectifyPopup::new(id, range, &selected);
        Ok(Some(self.popups.open(PopupContent::Rectify(popup))))
    }

    pub fn rectify_state(&self) -> RectifyState {
        match self.popups.rectify() {
            None => RectifyState::Idle,
            Some((_, popup)) if popup.phase() == RectifyPhase::Rectifying => RectifyState::Rectifying,
            Some(_) => RectifyState::PopupOpen,
        }
    }

    pub fn rectify_popup(&self) -> Option<&RectifyPopup> {
        self.popups.rectify().map(|(_, popup)| popup)
    }

    pub fn rectify_popup_mut(&mut self) -> Option<&mut RectifyPopup> {
        self.popups.rectify_mut()
    }

    /// Starts a retry on the open rectify popup.
    ///
    /// Returns the popup the answer belongs to alongside the call to issue.
    pub fn begin_rectify(&mut self) -> Result<(PopupId, RectifyRequest), EditorError> {
        let popup = self.popups.current().ok_or(EditorError::NoRectifyPopup)?;
        let request = self
            .popups
            .rectify_mut()
            .ok_or(EditorError::NoRectifyPopup)?
            .begin_retry()?;
        Ok((popup, request))
    }

    /// Delivers the answer of the retry started on `popup`.
    ///
    /// If that popup was closed or superseded meanwhile the answer is dropped.
    pub fn finish_rectify(
        &mut self,
        popup: PopupId,
        result: Result<String, RemoteError>,
    ) -> Result<(), EditorError> {
        if self.popups.current() != Some(popup) {
            debug!("rectify answer for {popup} arrived after its popup closed");
            return Err(EditorError::NoRectifyPopup);
        }
        self.popups
            .rectify_mut()
            .ok_or(EditorError::NoRectifyPopup)?
            .finish_retry(result)
    }

    /// Runs one retry round-trip against `remote`.
    pub fn retry_rectify(&mut self, remote: &dyn RemoteFiles) -> Result<(), EditorError> {
        let (popup, request) = self.begin_rectify()?;
        let result = remote.rectify(&request.code, &request.prompt);
        self.finish_rectify(popup, result)
    }

    /// Applies the popup's code to the original selection and closes it.
    pub fn validate_rectify(&mut self) -> Result<(), EditorError> {
        let (popup_id, buffer, range, replacement) = self
            .popups
            .rectify()
            .map(|(id, popup)| (id, popup.buffer(), popup.selection(), popup.code().to_string()))
            .ok_or(EditorError::NoRectifyPopup)?;
        self.popups.close(popup_id);
        if self.bound() != Some(buffer) {
            warn!("rectify popup belongs to an unbound buffer, discarding");
            return Err(EditorError::NoActiveBuffer);
        }
        self.surface.apply_edit(range, &replacement)
    }

    /// Toggles the settings menu nested in the rectify popup.
    pub fn toggle_rectify_settings(&mut self) -> Result<bool, EditorError> {
        let popup_id = self
            .popups
            .rectify()
            .map(|(id, _)| id)
            .ok_or(EditorError::NoRectifyPopup)?;
        self.popups.toggle_nested(popup_id, NestedKind::Settings)
    }

    pub fn popups(&self) -> &PopupCoordinator {
        &self.popups
    }

    pub fn popups_mut(&mut self) -> &mut PopupCoordinator {
        &mut self.popups
    }

    /// Routes a document pointer-down to the popup layer.
    pub fn pointer_down(&mut self, target: PointerTarget) -> Option<PopupId> {
        self.popups.pointer_down(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::surface::TextSurface;
    use crate::test_support::{Call, FakeRemote};

    struct Fixture {
        session: EditorSession<TextSurface>,
        registry: BufferRegistry,
        saves: SaveQueue,
        remote: Arc<FakeRemote>,
        ids: Vec<BufferId>,
    }

    impl Fixture {
        fn bind(&mut self, index: usize) {
            self.session
                .bind(&mut self.registry, &self.saves, self.ids[index])
                .expect("bind");
        }

        fn sync(&mut self) -> usize {
            self.session.sync(&mut self.registry, &self.saves)
        }

        fn content(&self, index: usize) -> &str {
            self.registry.get(self.ids[index]).expect("buffer").content()
        }
    }

    fn setup(files: &[(&str, &str)]) -> Fixture {
        let remote = Arc::new(FakeRemote::default());
        let saves = SaveQueue::spawn(remote.clone(), Duration::ZERO).expect("spawn");
        let mut registry = BufferRegistry::new();
        let ids = files
            .iter()
            .map(|(path, content)| registry.open(path, *content).expect("open"))
            .collect();
        Fixture {
            session: EditorSession::new(TextSurface::new(), true),
            registry,
            saves,
            remote,
            ids,
        }
    }

    fn span(start: u32, end: u32) -> TextRange {
        TextRange::new(Position::new(0, start), Position::new(0, end))
    }

    #[test]
    fn rebinding_keeps_a_single_listener() {
        let mut fx = setup(&[("a.js", "a"), ("b.py", "b")]);
        for round in 0..10 {
            fx.bind(round % 2);
            assert_eq!(fx.session.surface().listener_count(), 1);
        }
        assert_eq!(fx.session.surface().content(), "b");
        assert_eq!(fx.session.surface().language(), "python");
    }

    #[test]
    fn edits_only_reach_the_bound_buffer() {
        let mut fx = setup(&[("a.js", "one"), ("b.js", "two")]);

        fx.bind(0);
        fx.session
            .edit(TextRange::caret(Position::new(0, 3)), "!")
            .expect("edit");
        assert_eq!(fx.sync(), 1);
        fx.bind(1);
        assert_eq!(fx.sync(), 0);

        fx.session
            .edit(TextRange::caret(Position::new(0, 0)), ">")
            .expect("edit");
        assert_eq!(fx.sync(), 1);
        assert_eq!(fx.content(0), "one!");
        assert_eq!(fx.content(1), ">two");
        assert!(fx.registry.get(fx.ids[1]).expect("b").is_dirty());

        fx.saves.flush();
        assert_eq!(
            fx.remote.calls(),
            vec![
                Call::Save("a.js".to_string(), "one!".to_string(), 1),
                Call::Save("b.js".to_string(), ">two".to_string(), 1),
            ]
        );
        fx.sync();
        assert!(!fx.registry.get(fx.ids[0]).expect("a").is_dirty());
        assert!(!fx.registry.get(fx.ids[1]).expect("b").is_dirty());
    }

    #[test]
    fn rebinding_applies_edits_not_yet_synced() {
        let mut fx = setup(&[("a.js", "one"), ("b.js", "two")]);
        fx.bind(0);
        fx.session
            .surface_mut()
            .apply_edit(TextRange::caret(Position::new(0, 3)), "!")
            .expect("widget edit");

        fx.bind(1);
        assert_eq!(fx.content(0), "one!");
        assert!(fx.registry.get(fx.ids[0]).expect("a").is_dirty());
        assert_eq!(fx.content(1), "two");

        fx.session
            .edit(TextRange::caret(Position::new(0, 0)), ">")
            .expect("edit");
        fx.session.unbind(&mut fx.registry, &fx.saves);
        assert_eq!(fx.content(1), ">two");
        assert_eq!(fx.content(0), "one!");

        fx.saves.flush();
        assert_eq!(
            fx.remote.saves(),
            vec![
                ("a.js".to_string(), "one!".to_string(), 1),
                ("b.js".to_string(), ">two".to_string(), 1),
            ]
        );
    }

    #[test]
    fn autocompletion_toggle_leaves_no_residual_providers() {
        let mut fx = setup(&[("a.js", ""), ("b.py", ""), ("c.js", "")]);
        fx.bind(0);
        fx.bind(2);
        assert_eq!(fx.session.surface().completion_providers().len(), 1);

        fx.session.set_autocompletion(true, &fx.registry);
        assert_eq!(fx.session.surface().completion_providers().len(), 2);

        fx.session.set_autocompletion(false, &fx.registry);
        fx.bind(1);
        assert!(fx.session.surface().completion_providers().is_empty());
        assert!(fx.session.completions().is_empty());
    }

    #[test]
    fn completion_without_provider_requests_nothing() {
        let mut fx = setup(&[("a.js", "foo")]);
        fx.session.set_autocompletion(false, &fx.registry);
        fx.bind(0);
        let items = fx
            .session
            .complete(&fx.registry, fx.remote.as_ref(), Position::new(0, 3))
            .expect("complete");
        assert!(items.is_empty());
        assert!(fx.remote.calls().is_empty());
    }

    #[test]
    fn rectify_retry_then_validate_replaces_selection() {
        let mut fx = setup(&[("a.js", "var total = 0;\nrest")]);
        fx.remote.set_rectified("const total = 0;");
        fx.bind(0);

        let popup = fx.session.select(span(0, 14)).expect("select").expect("popup opened");
        assert_eq!(fx.session.rectify_state(), RectifyState::PopupOpen);

        fx.session.retry_rectify(fx.remote.as_ref()).expect("retry");
        assert_eq!(
            fx.remote.calls(),
            vec![Call::Rectify("var total = 0;".to_string(), String::new())]
        );
        assert_eq!(
            fx.session.rectify_popup().map(RectifyPopup::code),
            Some("const total = 0;")
        );

        fx.session.validate_rectify().expect("validate");
        assert_eq!(fx.session.surface().content(), "const total = 0;\nrest");
        assert!(!fx.session.popups().is_open(popup));
        assert_eq!(fx.session.rectify_state(), RectifyState::Idle);
    }

    #[test]
    fn late_rectify_answer_never_reaches_a_newer_popup() {
        let mut fx = setup(&[("a.js", "alpha beta")]);
        fx.bind(0);

        let first = fx.session.select(span(0, 5)).expect("select").expect("popup");
        let (issued_on, request) = fx.session.begin_rectify().expect("begin");
        assert_eq!(issued_on, first);
        assert_eq!(request.code, "alpha");
        assert_eq!(fx.session.rectify_state(), RectifyState::Rectifying);

        assert_eq!(fx.session.pointer_down(PointerTarget::Outside), Some(first));
        let second = fx.session.select(span(6, 10)).expect("select").expect("popup");
        assert_eq!(
            fx.session.finish_rectify(issued_on, Ok("ALPHA".to_string())),
            Err(EditorError::NoRectifyPopup)
        );
        assert_eq!(fx.session.rectify_popup().map(RectifyPopup::code), Some("beta"));
        assert_eq!(fx.session.rectify_state(), RectifyState::PopupOpen);

        fx.session.validate_rectify().expect("validate");
        assert!(!fx.session.popups().is_open(second));
        assert_eq!(fx.session.surface().content(), "alpha beta");
    }

    #[test]
    fn outside_click_discards_rectify() {
        let mut fx = setup(&[("a.js", "abc")]);
        fx.bind(0);
        let popup = fx.session.select(span(0, 2)).expect("select").expect("popup");
        assert_eq!(fx.session.toggle_rectify_settings(), Ok(true));
        assert_eq!(fx.session.pointer_down(PointerTarget::Inside(popup)), None);
        assert_eq!(fx.session.pointer_down(PointerTarget::Outside), Some(popup));
        assert_eq!(fx.session.rectify_state(), RectifyState::Idle);
        assert_eq!(fx.session.surface().content(), "abc");
        assert_eq!(fx.session.validate_rectify(), Err(EditorError::NoRectifyPopup));
    }

    #[test]
    fn empty_selection_opens_nothing() {
        let mut fx = setup(&[("a.js", "abc")]);
        fx.bind(0);
        let opened = fx
            .session
            .select(TextRange::caret(Position::new(0, 1)))
            .expect("select");
        assert_eq!(opened, None);
        assert_eq!(fx.session.popups().listener_count(), 0);
    }
}
