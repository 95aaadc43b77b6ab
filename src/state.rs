use tracing::{debug, info};

use crate::db::{Config, Db};
use crate::error::LauncherError;
use crate::host::HostRecord;
use crate::launcher::{Launcher, TerminalEmulator};
use crate::profile::TerminalProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Everything the UI can ask the core to do. Indices point into the full
/// lists, not into a filtered view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Connect(usize),
    LaunchProfile(usize),
    /// Adds the host when `index` is `None`, replaces it otherwise.
    SaveHost {
        index: Option<usize>,
        host: HostRecord,
    },
    DuplicateHost(usize),
    DeleteHost(usize),
    MoveHost(usize, Direction),
    SaveProfile {
        index: Option<usize>,
        profile: TerminalProfile,
    },
    DuplicateProfile(usize),
    DeleteProfile(usize),
    MoveProfile(usize, Direction),
    OpenLink(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Redraw the lists and select `selected` if given.
    Refresh {
        selected: Option<usize>,
        message: Option<String>,
    },
    /// A terminal was started and the launcher is done.
    Exit(Option<String>),
}

impl Outcome {
    fn select(selected: Option<usize>) -> Self {
        Outcome::Refresh {
            selected,
            message: None,
        }
    }
}

/// The in-memory host and profile lists, persisted after every change.
///
/// A failed save is returned as an error but the change stays in memory.
pub struct AppState {
    db: Db,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn hosts(&self) -> &[HostRecord] {
        &self.db.hosts
    }

    pub fn profiles(&self) -> &[TerminalProfile] {
        &self.db.profiles
    }

    /// Indices of the hosts whose name or address contains `filter`.
    pub fn filter_hosts(&self, filter: &str) -> Vec<usize> {
        filter_indices(&self.db.hosts, |host| host.matches(filter))
    }

    pub fn filter_profiles(&self, filter: &str) -> Vec<usize> {
        filter_indices(&self.db.profiles, |profile| profile.matches(filter))
    }

    pub fn add_host(&mut self, host: HostRecord) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| {
            config.hosts.push(host);
            Some(config.hosts.len() - 1)
        })
    }

    pub fn update_host(
        &mut self,
        index: usize,
        host: HostRecord,
    ) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| replace(&mut config.hosts, index, host))
    }

    pub fn duplicate_host(&mut self, index: usize) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| {
            let copy = config.hosts.get(index)?.duplicate();
            config.hosts.push(copy);
            Some(config.hosts.len() - 1)
        })
    }

    pub fn delete_host(&mut self, index: usize) -> Result<Option<HostRecord>, LauncherError> {
        self.persist(|config| remove(&mut config.hosts, index))
    }

    pub fn move_host(
        &mut self,
        index: usize,
        direction: Direction,
    ) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| move_item(&mut config.hosts, index, direction))
    }

    pub fn add_profile(&mut self, profile: TerminalProfile) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| {
            config.profiles.push(profile);
            Some(config.profiles.len() - 1)
        })
    }

    pub fn update_profile(
        &mut self,
        index: usize,
        profile: TerminalProfile,
    ) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| replace(&mut config.profiles, index, profile))
    }

    pub fn duplicate_profile(&mut self, index: usize) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| {
            let copy = config.profiles.get(index)?.duplicate();
            config.profiles.push(copy);
            Some(config.profiles.len() - 1)
        })
    }

    pub fn delete_profile(
        &mut self,
        index: usize,
    ) -> Result<Option<TerminalProfile>, LauncherError> {
        self.persist(|config| remove(&mut config.profiles, index))
    }

    pub fn move_profile(
        &mut self,
        index: usize,
        direction: Direction,
    ) -> Result<Option<usize>, LauncherError> {
        self.persist(|config| move_item(&mut config.profiles, index, direction))
    }

    /// Runs one action against the state.
    pub fn dispatch<T: TerminalEmulator>(
        &mut self,
        action: Action,
        launcher: &Launcher<T>,
    ) -> Result<Outcome, LauncherError> {
        debug!(?action, "dispatch");
        let outcome = match action {
            Action::Connect(index) => match self.db.hosts.get(index) {
                Some(host) => {
                    launcher.connect(host)?;
                    Outcome::Exit(None)
                }
                None => Outcome::select(None),
            },
            Action::LaunchProfile(index) => match self.db.profiles.get(index) {
                Some(profile) => Outcome::Exit(launcher.launch_profile(profile)?),
                None => Outcome::select(None),
            },
            Action::SaveHost { index: None, host } => Outcome::select(self.add_host(host)?),
            Action::SaveHost {
                index: Some(index),
                host,
            } => Outcome::select(self.update_host(index, host)?),
            Action::DuplicateHost(index) => Outcome::select(self.duplicate_host(index)?),
            Action::DeleteHost(index) => {
                let removed = self.delete_host(index)?;
                Outcome::Refresh {
                    selected: None,
                    message: removed.map(|host| format!("Deleted host '{}'", host.name)),
                }
            }
            Action::MoveHost(index, direction) => {
                Outcome::select(self.move_host(index, direction)?.or(Some(index)))
            }
            Action::SaveProfile {
                index: None,
                profile,
            } => Outcome::select(self.add_profile(profile)?),
            Action::SaveProfile {
                index: Some(index),
                profile,
            } => Outcome::select(self.update_profile(index, profile)?),
            Action::DuplicateProfile(index) => Outcome::select(self.duplicate_profile(index)?),
            Action::DeleteProfile(index) => {
                let removed = self.delete_profile(index)?;
                Outcome::Refresh {
                    selected: None,
                    message: removed.map(|profile| format!("Deleted profile '{}'", profile.name)),
                }
            }
            Action::MoveProfile(index, direction) => {
                Outcome::select(self.move_profile(index, direction)?.or(Some(index)))
            }
            Action::OpenLink(url) => {
                open::that(&url).map_err(|source| LauncherError::OpenLink {
                    url: url.clone(),
                    source,
                })?;
                info!("opened {}", url);
                Outcome::select(None)
            }
        };
        Ok(outcome)
    }

    /// Applies `change` and saves when it reports that something changed.
    fn persist<R>(
        &mut self,
        change: impl FnOnce(&mut Config) -> Option<R>,
    ) -> Result<Option<R>, LauncherError> {
        let result = change(&mut *self.db);
        if result.is_some() {
            self.db.flush()?;
        }
        Ok(result)
    }
}

fn filter_indices<T>(items: &[T], mut keep: impl FnMut(&T) -> bool) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| keep(item))
        .map(|(i, _)| i)
        .collect()
}

fn replace<T>(items: &mut [T], index: usize, item: T) -> Option<usize> {
    let slot = items.get_mut(index)?;
    *slot = item;
    Some(index)
}

fn remove<T>(items: &mut Vec<T>, index: usize) -> Option<T> {
    (index < items.len()).then(|| items.remove(index))
}

/// Swaps with the neighbour; `None` at either end of the list.
fn move_item<T>(items: &mut [T], index: usize, direction: Direction) -> Option<usize> {
    let target = match direction {
        Direction::Up => index.checked_sub(1)?,
        Direction::Down => index + 1,
    };
    if index >= items.len() || target >= items.len() {
        return None;
    }
    items.swap(index, target);
    Some(target)
}
