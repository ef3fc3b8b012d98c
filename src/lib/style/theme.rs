use crate::*;
use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use notify::{event::ModifyKind, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A parsed set of techniques.
#[derive(Debug, Clone)]
pub struct Theme {
    generation: u32,
    techniques: Vec<Rc<Technique>>,
}

impl Theme {
    /// Parses `source`, keying every technique with `generation` and its rule index.
    pub fn parse(source: &str, generation: u32) -> Result<Self> {
        let techniques = try_parse_theme(source)?
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                Rc::new(Technique::from_rule(
                    rule,
                    TechniqueKey::new(generation, index as u32),
                ))
            })
            .collect();
        Ok(Self {
            generation,
            techniques,
        })
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn techniques(&self) -> &[Rc<Technique>] {
        &self.techniques
    }

    /// Finds the first technique declared with exactly `name` as its selector.
    pub fn find(&self, name: &str) -> Option<&Rc<Technique>> {
        self.techniques.iter().find(|t| t.name == name)
    }
}

/// Holds the current theme and reloads it when its file changes.
pub struct ThemeCache {
    theme: Theme,
    path: PathBuf,
    rx: Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl ThemeCache {
    /// Loads the theme at `path` and starts watching it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path)?;
        let theme = Theme::parse(&contents, 0)?;

        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            if tx.send(event).is_err() {
                log::debug!("Could not forward a theme file event. The theme cache is gone.");
            }
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        Ok(Self {
            theme,
            path,
            rx,
            _watcher: watcher,
        })
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads the theme if the watched file was modified.
    ///
    /// Returns whether a successful reload happened. Callers must reset their handler
    /// pools when it did, the old materials were built against the previous theme.
    pub fn update(&mut self) -> bool {
        let mut modified = false;
        loop {
            match self.rx.try_recv() {
                Ok(Ok(Event {
                    kind: EventKind::Modify(ModifyKind::Data(_)),
                    ..
                })) => modified = true,
                // Everything is alright but the file wasn't actually changed.
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    log::info!("Something went wrong with the theme file watcher:\r\n{:?}", err);
                }
                // This happens all the time when there is no new message.
                Err(TryRecvError::Empty) => break,
                Err(err) => {
                    log::info!("Something went wrong with the theme file watcher:\r\n{:?}", err);
                    break;
                }
            }
        }

        modified && self.try_reload()
    }

    /// Tries reloading the theme from its file.
    ///
    /// Keeps the current theme on any error.
    pub fn try_reload(&mut self) -> bool {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                log::info!("Failed to read the theme at {:?}: {}", self.path, err);
                return false;
            }
        };
        match Theme::parse(&contents, self.theme.generation + 1) {
            Ok(theme) => {
                log::info!(
                    "Reloaded theme {:?} with {} techniques.",
                    self.path,
                    theme.techniques.len()
                );
                self.theme = theme;
                true
            }
            Err(err) => {
                log::info!("Keeping the previous theme. {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME: &str = "
        fill[layer=water] { color: #0000ff; }
        solid-line.road { line-width: 4px; color: #ffffff; }
    ";

    #[test]
    fn keys_techniques_by_generation_and_index() {
        let theme = Theme::parse(THEME, 3).expect("valid theme");
        assert_eq!(theme.techniques().len(), 2);
        assert_eq!(theme.techniques()[1].key, TechniqueKey::new(3, 1));
        let water = theme.find("fill[layer=water]").expect("water technique");
        assert_eq!(water.kind, TechniqueKind::Fill);
    }

    #[test]
    fn reload_bumps_the_generation() {
        let path = std::env::temp_dir().join(format!("sextant-theme-{}.css", std::process::id()));
        std::fs::write(&path, THEME).expect("writable temp dir");

        let mut cache = ThemeCache::load(&path).expect("theme loads");
        assert_eq!(cache.theme().generation(), 0);

        std::fs::write(&path, "terrain { color: #aabbcc; }").expect("writable temp dir");
        assert!(cache.try_reload());
        assert_eq!(cache.theme().generation(), 1);
        assert_eq!(cache.theme().techniques()[0].kind, TechniqueKind::Terrain);

        // A broken file keeps the last good theme.
        std::fs::write(&path, "terrain { color").expect("writable temp dir");
        assert!(!cache.try_reload());
        assert_eq!(cache.theme().generation(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
