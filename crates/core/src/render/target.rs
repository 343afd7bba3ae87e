use crate::render::{RenderTarget, Section, SectionView};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    containers: BTreeSet<String>,
    views: BTreeMap<String, SectionView>,
    selected: BTreeMap<String, String>,
    writes: BTreeMap<String, usize>,
}

/// Keeps the latest view per container in memory. Clones share the same state, so a test can
/// hand one clone to the dashboard and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTarget {
    pub fn with_containers<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MemoryState {
            containers: containers.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_all_sections() -> Self {
        Self::with_containers(Section::ALL.iter().map(|s| s.container()))
    }

    pub fn view(&self, container: &str) -> Option<SectionView> {
        self.lock().views.get(container).cloned()
    }

    pub fn selected(&self, container: &str) -> Option<String> {
        self.lock().selected.get(container).cloned()
    }

    /// Successful `replace` calls so far.
    pub fn writes(&self) -> usize {
        self.lock().writes.values().sum()
    }

    pub fn writes_to(&self, container: &str) -> usize {
        self.lock().writes.get(container).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderTarget for MemoryTarget {
    fn has_container(&self, container: &str) -> bool {
        self.lock().containers.contains(container)
    }

    fn replace(&mut self, container: &str, view: &SectionView) -> Result<()> {
        let mut state = self.lock();
        anyhow::ensure!(
            state.containers.contains(container),
            "unknown container {container}"
        );
        state.views.insert(container.to_string(), view.clone());
        state.selected.remove(container);
        *state.writes.entry(container.to_string()).or_default() += 1;
        Ok(())
    }

    fn select_row(&mut self, container: &str, key: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        anyhow::ensure!(
            state.containers.contains(container),
            "unknown container {container}"
        );
        match key {
            Some(key) => state.selected.insert(container.to_string(), key.to_string()),
            None => state.selected.remove(container),
        };
        Ok(())
    }
}

#[derive(Serialize)]
struct ContainerFile<'a> {
    container: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<&'a str>,
    view: &'a SectionView,
}

/// Writes each container to `<dir>/<container>.json` for an external front end to pick up.
#[derive(Debug)]
pub struct JsonDirTarget {
    dir: PathBuf,
    views: BTreeMap<String, SectionView>,
    selected: BTreeMap<String, String>,
}

impl JsonDirTarget {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create render dir {}", dir.display()))?;
        Ok(Self {
            dir,
            views: BTreeMap::new(),
            selected: BTreeMap::new(),
        })
    }

    fn flush(&self, container: &str) -> Result<()> {
        let Some(view) = self.views.get(container) else {
            return Ok(());
        };
        let file = ContainerFile {
            container,
            selected: self.selected.get(container).map(String::as_str),
            view,
        };
        let body = serde_json::to_vec_pretty(&file).context("failed to serialize view")?;

        // Readers must never see a half-written file.
        let path = self.dir.join(format!("{container}.json"));
        let tmp = self.dir.join(format!(".{container}.json.tmp"));
        std::fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move view into {}", path.display()))?;
        Ok(())
    }
}

impl RenderTarget for JsonDirTarget {
    fn has_container(&self, container: &str) -> bool {
        Section::ALL.iter().any(|s| s.container() == container)
    }

    fn replace(&mut self, container: &str, view: &SectionView) -> Result<()> {
        self.views.insert(container.to_string(), view.clone());
        self.selected.remove(container);
        self.flush(container)
    }

    fn select_row(&mut self, container: &str, key: Option<&str>) -> Result<()> {
        match key {
            Some(key) => self.selected.insert(container.to_string(), key.to_string()),
            None => self.selected.remove(container),
        };
        self.flush(container)
    }
}
