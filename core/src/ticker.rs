//! The engine facade hosts talk to.
//!
//! A [`Ticker`] ties the scroller to its timers, the drag tracker and the message index. Hosts
//! feed it notifications, pointer events and the current time, sleep until
//! [`Ticker::next_deadline`], and call [`Ticker::render`] whenever [`Ticker::needs_render`].

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tickertape_protocol::MessageId;
use tickertape_protocol::Notification;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::HostError;
use crate::TickerConfig;
use crate::clock::AnimationClock;
use crate::clock::TimerHandle;
use crate::clock::TimerQueue;
use crate::clock::TimerTarget;
use crate::damage::Damage;
use crate::glyph::ContentGlyph;
use crate::glyph::FadeOutcome;
use crate::glyph::Glyph;
use crate::host::Measure;
use crate::host::Surface;
use crate::interaction::DragAction;
use crate::interaction::DragTracker;
use crate::interaction::PointerButton;
use crate::interaction::PointerEvent;
use crate::queue::GlyphId;
use crate::scroller::Direction;
use crate::scroller::Scroller;

/// Result of [`Ticker::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(GlyphId),
    /// A message with the same id was already live and has been replaced.
    Replaced(GlyphId),
    /// The message belongs to a killed thread and was dropped.
    Suppressed,
}

/// Notifications the host should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerEvent {
    /// Primary click; `None` when the click landed on the gap.
    Selected(Option<Arc<Notification>>),
    /// Secondary click on a message that carries an attachment.
    OpenAttachment(Arc<Notification>),
}

#[derive(Debug)]
pub struct Ticker {
    config: TickerConfig,
    scroller: Scroller,
    timers: TimerQueue<TimerTarget>,
    clock: AnimationClock,
    drag: DragTracker,
    step: i32,
    paused: bool,
    index: HashMap<MessageId, GlyphId>,
    killed: KilledThreads,
}

/// Killed thread ids, forgetting the oldest once full.
#[derive(Debug)]
struct KilledThreads {
    ids: HashSet<MessageId>,
    order: VecDeque<MessageId>,
    capacity: usize,
}

impl KilledThreads {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Returns whether `id` was newly remembered.
    fn insert(&mut self, id: MessageId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        if self.order.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.ids.remove(&oldest);
            trace!(%oldest, "forgot killed thread");
        }
        self.order.push_back(id.clone());
        self.ids.insert(id);
        true
    }
}

impl Ticker {
    pub fn new(config: TickerConfig, viewport_width: i32) -> Self {
        let config = config.sanitized();
        let mut scroller = Scroller::new(
            viewport_width,
            config.min_gap_width,
            config.max_fade_levels,
        );
        if let Some(direction) = Direction::of(config.step) {
            scroller.set_direction(direction);
        }
        Self {
            drag: DragTracker::new(config.drag_dead_zone),
            step: config.step,
            scroller,
            timers: TimerQueue::new(),
            clock: AnimationClock::default(),
            paused: false,
            index: HashMap::new(),
            killed: KilledThreads::new(config.max_killed_threads),
            config,
        }
    }

    pub fn config(&self) -> &TickerConfig {
        &self.config
    }

    /// Adds a notification to the end of the queue.
    ///
    /// The glyph's width is measured once, now; its fade timer starts now.
    pub fn insert(
        &mut self,
        message: Notification,
        measure: &dyn Measure,
        now: Instant,
    ) -> InsertOutcome {
        if self.is_suppressed(&message) {
            debug!(id = %message.id, "dropping notification from killed thread");
            self.killed.insert(message.id);
            return InsertOutcome::Suppressed;
        }

        let previous = self
            .index
            .get(&message.id)
            .copied()
            .filter(|glyph| self.scroller.is_live(*glyph));
        if let Some(previous) = previous {
            self.scroller.delete(previous, &mut self.timers);
        }

        let message = Arc::new(message);
        let text = message.display_text();
        let width = measure.measure(&text);
        let glyph = self
            .scroller
            .insert(ContentGlyph::new(Arc::clone(&message), text, width));
        self.schedule_fade(glyph, &message, now);
        self.sweep_released();
        self.index.insert(message.id.clone(), glyph);
        self.sync_clock(now);

        trace!(id = %message.id, width, "inserted notification");
        match previous {
            Some(_) => InsertOutcome::Replaced(glyph),
            None => InsertOutcome::Inserted(glyph),
        }
    }

    fn is_suppressed(&self, message: &Notification) -> bool {
        self.killed.contains(&message.id)
            || message
                .in_reply_to
                .as_ref()
                .is_some_and(|parent| self.killed.contains(parent))
    }

    fn fade_interval(&self, message: &Notification) -> Option<Duration> {
        let total = message.timeout_or(self.config.default_timeout);
        if total.is_zero() {
            return None;
        }
        Some(self.config.fade_step(total))
    }

    fn schedule_fade(&mut self, glyph: GlyphId, message: &Notification, now: Instant) {
        let Some(interval) = self.fade_interval(message) else {
            return;
        };
        let handle = self.timers.schedule(now, interval, TimerTarget::Fade(glyph));
        if let Some(content) = self.scroller.glyph_mut(glyph).and_then(Glyph::content_mut) {
            content.set_fade_timer(Some(handle));
        }
    }

    /// Removes a message immediately, closing the hole it leaves. Unknown ids are ignored.
    pub fn delete(&mut self, id: &MessageId) -> bool {
        let Some(glyph) = self.index.get(id).copied() else {
            return false;
        };
        let deleted = self.scroller.delete(glyph, &mut self.timers);
        self.sweep_released();
        self.halt_if_idle();
        deleted
    }

    /// Deletes a message and everything replying to it, and drops future replies.
    ///
    /// Returns how many glyphs were removed.
    pub fn kill(&mut self, id: &MessageId) -> usize {
        self.killed.insert(id.clone());
        let mut removed = 0;
        if let Some(glyph) = self.index.get(id).copied()
            && self.scroller.delete(glyph, &mut self.timers)
        {
            removed += 1;
        }

        loop {
            let mut grew = false;
            for glyph in self.scroller.queued_glyphs() {
                let Some(message) = self.scroller.glyph(glyph).and_then(Glyph::message) else {
                    continue;
                };
                if !self.is_suppressed(message) {
                    continue;
                }
                grew |= self.killed.insert(message.id.clone());
                if self.scroller.delete(glyph, &mut self.timers) {
                    removed += 1;
                }
            }
            if !grew {
                break;
            }
        }

        self.sweep_released();
        self.halt_if_idle();
        debug!(%id, removed, "killed thread");
        removed
    }

    /// Makes the message's next fade tick final, after a short fixed delay.
    pub fn expire_now(&mut self, id: &MessageId, now: Instant) -> bool {
        let Some(glyph) = self.index.get(id).copied() else {
            return false;
        };
        if !self.scroller.is_queued(glyph) {
            return false;
        }
        let Some(content) = self.scroller.glyph_mut(glyph).and_then(Glyph::content_mut) else {
            return false;
        };
        content.request_fast_fade();
        if let Some(handle) = content.take_fade_timer() {
            self.timers.cancel(handle);
        }
        let handle = self
            .timers
            .schedule(now, self.config.expire_now_delay, TimerTarget::Fade(glyph));
        content.set_fade_timer(Some(handle));
        true
    }

    /// Resizes the viewport. Widths below one pixel are clamped.
    pub fn resize(&mut self, viewport_width: i32) {
        self.scroller.resize(viewport_width.max(1));
        self.sweep_released();
        self.halt_if_idle();
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn set_step(&mut self, step: i32, now: Instant) {
        self.step = step;
        if let Some(direction) = Direction::of(step) {
            self.scroller.set_direction(direction);
        }
        self.sync_clock(now);
        debug!(step, "scroll step changed");
    }

    pub fn faster(&mut self, now: Instant) {
        self.set_step(self.step.saturating_add(1), now);
    }

    pub fn slower(&mut self, now: Instant) {
        self.set_step(self.step.saturating_sub(1), now);
    }

    pub fn direction(&self) -> Direction {
        self.scroller.direction()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        self.paused = paused;
        self.sync_clock(now);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Scrolls by `delta` pixels right away, independent of the clock.
    pub fn advance(&mut self, delta: i32) {
        self.scroller.advance(delta);
        self.sweep_released();
        self.halt_if_idle();
    }

    pub fn on_pointer_event(&mut self, event: PointerEvent, now: Instant) -> Option<TickerEvent> {
        match self.drag.handle(event) {
            DragAction::Ignore => None,
            DragAction::Begin { delta } => {
                self.clock.stop(&mut self.timers);
                self.advance(delta);
                None
            }
            DragAction::Scroll { delta } => {
                self.advance(delta);
                None
            }
            DragAction::End { delta } => {
                self.advance(delta);
                if let Some(direction) = Direction::of(self.step) {
                    self.scroller.set_direction(direction);
                }
                self.sync_clock(now);
                None
            }
            DragAction::Click { x, button } => {
                let message = self.message_at(x);
                match button {
                    PointerButton::Primary => Some(TickerEvent::Selected(message)),
                    PointerButton::Secondary => message
                        .filter(|message| message.has_attachment())
                        .map(TickerEvent::OpenAttachment),
                }
            }
        }
    }

    /// Earliest pending timer. Hosts sleep until then and call [`Ticker::process_due`].
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Runs every timer due at `now`. Returns how many fired.
    pub fn process_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some((handle, target)) = self.timers.pop_due(now) {
            fired += 1;
            match target {
                TimerTarget::Scroll => {
                    if self.clock.fired(handle) {
                        self.scroller.advance(self.step);
                        self.sweep_released();
                        self.sync_clock(now);
                    }
                }
                TimerTarget::Fade(glyph) => self.on_fade_tick(glyph, handle, now),
            }
        }
        fired
    }

    fn on_fade_tick(&mut self, glyph: GlyphId, handle: TimerHandle, now: Instant) {
        let max_fade_levels = self.config.max_fade_levels;
        let Some(content) = self.scroller.glyph_mut(glyph).and_then(Glyph::content_mut) else {
            warn!(?glyph, "fade timer fired for a released glyph");
            return;
        };
        if content.fade_timer() != Some(handle) {
            warn!(?glyph, "ignoring stale fade timer");
            return;
        }
        content.set_fade_timer(None);
        let message = Arc::clone(content.message());

        match content.on_fade_tick(max_fade_levels) {
            FadeOutcome::Faded(level) => {
                trace!(?glyph, level, "glyph faded");
                self.scroller.mark_glyph_dirty(glyph);
                self.schedule_fade(glyph, &message, now);
            }
            FadeOutcome::Expired => {
                debug!(id = %message.id, "notification expired");
                self.scroller.expire_passively(glyph, &mut self.timers);
                self.sweep_released();
                self.halt_if_idle();
            }
        }
    }

    fn should_run(&self) -> bool {
        self.step != 0
            && !self.paused
            && !self.drag.is_dragging()
            && !self.scroller.is_quiescent()
    }

    fn sync_clock(&mut self, now: Instant) {
        if self.should_run() {
            self.clock
                .start(&mut self.timers, now, self.config.tick_interval);
        } else {
            self.clock.stop(&mut self.timers);
        }
    }

    /// Stops the clock if nothing is left to animate. Never starts it.
    fn halt_if_idle(&mut self) {
        if !self.should_run() {
            self.clock.stop(&mut self.timers);
        }
    }

    fn sweep_released(&mut self) {
        for (glyph, message) in self.scroller.drain_released() {
            if self.index.get(&message.id) == Some(&glyph) {
                self.index.remove(&message.id);
            }
        }
    }

    /// Whether there is anything to repaint.
    pub fn needs_render(&self) -> bool {
        !self.scroller.damage().is_empty()
    }

    /// Repaint work accumulated since the last [`Ticker::render`].
    pub fn damage(&self) -> &Damage {
        self.scroller.damage()
    }

    /// Repaints accumulated damage: scroll steps translate the retained image and paint only the
    /// exposed strip; fade changes repaint only their holders; anything else repaints everything.
    pub fn render(&mut self, surface: &mut dyn Surface) -> Result<(), HostError> {
        let width = self.scroller.viewport_width();
        if surface.width() != width {
            return Err(HostError::SurfaceSize {
                expected: width,
                actual: surface.width(),
            });
        }
        let damage = self.scroller.take_damage();
        let result = if damage.is_full() {
            self.scroller.paint(surface, 0..width)
        } else {
            self.paint_incremental(surface, damage.scroll(), damage.dirty())
        };
        if result.is_err() {
            self.scroller.mark_full_damage();
        }
        result
    }

    fn paint_incremental(
        &self,
        surface: &mut dyn Surface,
        scroll: i32,
        dirty: &[std::ops::Range<i32>],
    ) -> Result<(), HostError> {
        if scroll != 0 {
            let exposed = surface.translate_and_expose(scroll);
            self.scroller.paint(surface, exposed)?;
        }
        for range in dirty {
            self.scroller.paint(surface, range.clone())?;
        }
        Ok(())
    }

    /// Message shown at viewport column `x`, if any.
    pub fn message_at(&self, x: i32) -> Option<Arc<Notification>> {
        let glyph = self.scroller.glyph_at(x)?;
        self.scroller.glyph(glyph)?.message().cloned()
    }

    /// Queued messages from oldest to newest.
    pub fn messages(&self) -> Vec<Arc<Notification>> {
        self.scroller
            .queued_glyphs()
            .into_iter()
            .filter_map(|glyph| self.scroller.glyph(glyph)?.message().cloned())
            .collect()
    }

    /// Whether a message is still queued or visible.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    pub fn glyph(&self, id: &MessageId) -> Option<&ContentGlyph> {
        let glyph = self.index.get(id)?;
        self.scroller.glyph(*glyph)?.content()
    }

    pub fn viewport_width(&self) -> i32 {
        self.scroller.viewport_width()
    }

    pub fn left_offset(&self) -> i32 {
        self.scroller.left_offset()
    }

    pub fn right_offset(&self) -> i32 {
        self.scroller.right_offset()
    }

    pub fn holder_widths(&self) -> Vec<i32> {
        self.scroller.holder_widths()
    }

    pub fn queue_len(&self) -> usize {
        self.scroller.queue_len()
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn is_quiescent(&self) -> bool {
        self.scroller.is_quiescent()
    }
}
