use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::track::Track;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop once the last track finishes.
    #[default]
    None,
    /// Loop the current track.
    One,
    /// Loop the whole queue.
    All,
}

/// Ordered playlist with a cursor.
///
/// Tracks before `position` have already played; they stay in the list so
/// `RepeatMode::All` can wrap back to them.
#[derive(Debug, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    position: usize,
    repeat: RepeatMode,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track under the cursor. `None` once the queue is exhausted.
    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.position)
    }

    /// Moves the cursor according to the repeat mode.
    pub fn advance(&mut self) {
        if self.repeat == RepeatMode::One {
            return;
        }
        self.step();
    }

    /// Moves past the current track even when repeating it.
    pub fn skip(&mut self) {
        self.step();
    }

    fn step(&mut self) {
        self.position += 1;

        if self.repeat == RepeatMode::All && self.position >= self.tracks.len() {
            self.position = 0;
        }
    }

    /// Adds tracks after the current one (`play_next`) or at the end.
    pub fn add(&mut self, tracks: impl IntoIterator<Item = Track>, play_next: bool) {
        if play_next {
            let at = (self.position + 1).min(self.tracks.len());
            let added: Vec<Track> = tracks.into_iter().collect();
            info!("➕ {} track(s) added to play next", added.len());
            self.tracks.splice(at..at, added);
        } else {
            let before = self.tracks.len();
            self.tracks.extend(tracks);
            info!("➕ {} track(s) added to the queue", self.tracks.len() - before);
        }
    }

    /// Empties the queue and returns the tracks that had not finished yet.
    ///
    /// Tracks before the cursor are dropped without being returned.
    pub fn clear(&mut self) -> Vec<Track> {
        let start = self.position.min(self.tracks.len());
        let remaining = self.tracks.split_off(start);

        if start > 0 {
            debug!("🗑️ Discarding {} already played track(s)", start);
        }

        self.tracks.clear();
        self.position = 0;
        info!("🗑️ Queue cleared ({} pending track(s))", remaining.len());
        remaining
    }

    /// Shuffles the tracks after the current one.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let start = self.position + 1;
        if self.tracks.len() < start + 2 {
            return;
        }

        self.tracks[start..].shuffle(rng);
        info!("🔀 Queue shuffled");
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        match mode {
            RepeatMode::None => info!("➡️ Repeat disabled"),
            RepeatMode::One => info!("🔂 Repeating current track"),
            RepeatMode::All => info!("🔁 Repeating queue"),
        }
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            tracks: self.tracks.clone(),
            position: self.position,
            repeat: self.repeat,
        }
    }
}

/// Snapshot of a queue for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueInfo {
    pub tracks: Vec<Track>,
    pub position: usize,
    pub repeat: RepeatMode,
}

impl QueueInfo {
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.position)
    }

    /// Tracks still to play after the current one.
    pub fn upcoming(&self) -> &[Track] {
        let start = (self.position + 1).min(self.tracks.len());
        &self.tracks[start..]
    }

    /// Page of upcoming tracks, 1-based.
    pub fn get_page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let upcoming = self.upcoming();
        let items_per_page = items_per_page.max(1);
        let safe_page = page.max(1);
        let start = (safe_page - 1).saturating_mul(items_per_page);
        let end = start.saturating_add(items_per_page).min(upcoming.len());
        let total_pages = if upcoming.is_empty() {
            1
        } else {
            upcoming.len().div_ceil(items_per_page)
        };

        QueuePage {
            items: if start < upcoming.len() {
                upcoming[start..end].to_vec()
            } else {
                Vec::new()
            },
            current_page: safe_page,
            total_pages,
            total_items: upcoming.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn tracks(names: &[&str]) -> Vec<Track> {
        names
            .iter()
            .map(|name| Track::new(*name, format!("https://host/{name}.mp3")))
            .collect()
    }

    fn names(queue: &Queue) -> Vec<&str> {
        queue.tracks().iter().map(Track::name).collect()
    }

    fn queue_of(names: &[&str]) -> Queue {
        let mut queue = Queue::new();
        queue.add(tracks(names), false);
        queue
    }

    #[test]
    fn current_track_out_of_bounds_is_none() {
        let mut queue = Queue::new();
        assert!(queue.current_track().is_none());

        queue.add(tracks(&["a"]), false);
        assert_eq!(queue.current_track().map(Track::name), Some("a"));

        queue.advance();
        assert!(queue.current_track().is_none());
    }

    #[test]
    fn repeat_none_exhausts_after_len_advances() {
        let mut queue = queue_of(&["a", "b", "c"]);

        for _ in 0..3 {
            assert!(queue.current_track().is_some());
            queue.advance();
        }

        assert!(queue.current_track().is_none());
        assert_eq!(queue.position(), 3);
    }

    #[test]
    fn repeat_all_wraps_to_start() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_repeat(RepeatMode::All);
        queue.advance();
        queue.advance();
        assert_eq!(queue.position(), 2);

        queue.advance();
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn repeat_one_never_moves() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance();
        queue.set_repeat(RepeatMode::One);

        for _ in 0..10 {
            queue.advance();
        }
        assert_eq!(queue.position(), 1);
    }

    #[test]
    fn skip_ignores_repeat_one() {
        let mut queue = queue_of(&["a", "b"]);
        queue.set_repeat(RepeatMode::One);
        queue.skip();
        assert_eq!(queue.current_track().map(Track::name), Some("b"));
    }

    #[test]
    fn play_next_inserts_after_cursor_in_order() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.advance();

        queue.add(tracks(&["t1", "t2"]), true);

        assert_eq!(names(&queue), vec!["a", "b", "t1", "t2", "c"]);
        assert_eq!(queue.position(), 1);
    }

    #[test]
    fn play_next_on_exhausted_queue_appends() {
        let mut queue = queue_of(&["a"]);
        queue.advance();
        queue.advance();

        queue.add(tracks(&["x"]), true);

        assert_eq!(names(&queue), vec!["a", "x"]);
    }

    #[test]
    fn add_appends_by_default() {
        let mut queue = queue_of(&["a"]);
        queue.add(tracks(&["b", "c"]), false);
        assert_eq!(names(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_returns_pending_tracks_and_resets() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e"]);
        queue.set_repeat(RepeatMode::All);
        queue.advance();
        queue.advance();

        let cleared = queue.clear();

        assert_eq!(
            cleared.iter().map(Track::name).collect::<Vec<_>>(),
            vec!["c", "d", "e"]
        );
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.repeat(), RepeatMode::All);
    }

    #[test]
    fn clear_past_the_end_returns_nothing() {
        let mut queue = queue_of(&["a"]);
        queue.advance();
        queue.advance();

        assert!(queue.clear().is_empty());
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn shuffle_keeps_played_and_current_tracks() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        queue.advance();
        queue.advance();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            queue.shuffle_with(&mut rng);

            assert_eq!(&names(&queue)[..3], &["a", "b", "c"]);
            let mut rest: Vec<&str> = names(&queue)[3..].to_vec();
            rest.sort_unstable();
            assert_eq!(rest, vec!["d", "e", "f", "g", "h"]);
        }
    }

    #[test]
    fn shuffle_with_fewer_than_two_remaining_is_noop() {
        let mut queue = queue_of(&["a", "b"]);
        queue.shuffle();
        assert_eq!(names(&queue), vec!["a", "b"]);

        let mut empty = Queue::new();
        empty.shuffle();
        assert!(empty.is_empty());
    }

    #[test]
    fn info_pages_upcoming_tracks() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e"]);
        queue.advance();
        let info = queue.info();

        assert_eq!(info.current().map(Track::name), Some("b"));
        assert_eq!(info.upcoming().len(), 3);

        let page = info.get_page(2, 2);
        assert_eq!(page.items.iter().map(Track::name).collect::<Vec<_>>(), vec!["e"]);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_items, 3);

        let empty = Queue::new().info().get_page(0, 10);
        assert_eq!(empty.current_page, 1);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn far_out_pages_are_empty() {
        let info = queue_of(&["a", "b", "c"]).info();

        let page = info.get_page(usize::MAX, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.current_page, usize::MAX);
        assert_eq!(page.total_pages, 1);

        assert!(info.get_page(2, usize::MAX).items.is_empty());
    }
}
