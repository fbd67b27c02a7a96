//! btrfs-backed location, reached through a [`Transport`].

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use snappush_core::{Config, Snapshot};

use crate::error::{io_err, LocationError};
use crate::location::Location;
use crate::spec::LocationSpec;
use crate::stream::SnapshotStream;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtrfsLocation {
    spec: LocationSpec,
    transport: Transport,
    btrfs: String,
    metadata_file: String,
}

#[derive(Debug, Clone, Copy)]
enum ListMode {
    Send,
    Receive,
}

impl BtrfsLocation {
    pub fn new(spec: LocationSpec, config: &Config) -> Self {
        let transport = match &spec {
            LocationSpec::Local { .. } => Transport::Local,
            LocationSpec::Remote { user, host, .. } => {
                Transport::ssh(user.clone(), host.clone(), &config.ssh)
            }
        };
        Self {
            spec,
            transport,
            btrfs: config.btrfs.clone(),
            metadata_file: config.metadata_file.clone(),
        }
    }

    /// Parse a `[user@]host:path` or local path specifier.
    pub fn parse(spec: &str, config: &Config) -> Result<Self, LocationError> {
        Ok(Self::new(LocationSpec::parse(spec)?, config))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn root(&self) -> &Path {
        self.spec.root()
    }

    fn quoted(&self, relative: &Path) -> String {
        quote_path(&self.root().join(relative))
    }

    /// `<root>/<dir>/`, the trailing slash keeps btrfs from treating the
    /// directory as a subvolume name.
    fn quoted_dir(&self, dir: &Path) -> String {
        let path = self.root().join(dir);
        if path.to_string_lossy().ends_with('/') {
            return quote_path(&path);
        }
        let mut path = path.into_os_string();
        path.push("/");
        quote_path(&PathBuf::from(path))
    }

    fn list_script(&self, mode: ListMode) -> String {
        let flag = match mode {
            ListMode::Send => "-u",
            ListMode::Receive => "-R",
        };
        format!(
            "{} subvolume list -o -p {flag} {}",
            shell_words::quote(&self.btrfs),
            self.quoted_dir(Path::new(""))
        )
    }

    fn delete_script(&self, snapshot: &Snapshot) -> String {
        let subvolume = self.quoted(&snapshot.path);
        format!(
            "if [ -d {subvolume} ]; then {} subvolume delete {subvolume}; fi && rm -rf {}",
            shell_words::quote(&self.btrfs),
            self.quoted(snapshot.dir())
        )
    }

    fn send_script(&self, parent: Option<&Snapshot>, child: &Snapshot) -> String {
        let btrfs = shell_words::quote(&self.btrfs);
        match parent {
            Some(parent) => format!(
                "{btrfs} send -p {} {}",
                self.quoted(&parent.path),
                self.quoted(&child.path)
            ),
            None => format!("{btrfs} send {}", self.quoted(&child.path)),
        }
    }

    fn receive_script(&self, dir: &Path) -> String {
        format!(
            "mkdir -p {} && {} receive {}",
            self.quoted(dir),
            shell_words::quote(&self.btrfs),
            self.quoted_dir(dir)
        )
    }

    fn metadata_path(&self, dir: &Path) -> String {
        self.quoted(&dir.join(&self.metadata_file))
    }

    fn list(&self, mode: ListMode) -> Result<String, LocationError> {
        let stdout = self.transport.capture(&self.list_script(mode))?;
        String::from_utf8(stdout).map_err(|_| LocationError::NonUtf8Listing {
            location: self.describe(),
        })
    }
}

impl Location for BtrfsLocation {
    fn describe(&self) -> String {
        self.spec.to_string()
    }

    fn list_for_send(&self) -> Result<String, LocationError> {
        self.list(ListMode::Send)
    }

    fn list_for_receive(&self) -> Result<String, LocationError> {
        self.list(ListMode::Receive)
    }

    fn delete(&self, snapshot: &Snapshot) -> Result<(), LocationError> {
        self.transport.run(&self.delete_script(snapshot))
    }

    fn send(
        &self,
        parent: Option<&Snapshot>,
        child: &Snapshot,
    ) -> Result<SnapshotStream, LocationError> {
        let script = self.send_script(parent, child);
        let process = self.transport.spawn_reader(&script)?;
        SnapshotStream::from_child(process, script)
    }

    fn receive(&self, stream: &mut dyn Read, dir: &Path) -> Result<(), LocationError> {
        let script = self.receive_script(dir);
        let mut process = self.transport.spawn_writer(&script)?;
        let copied = match process.stdin.take() {
            Some(mut stdin) => io::copy(stream, &mut stdin).map(|_| ()),
            None => Err(io::Error::other("receiver stdin was not piped")),
        };
        let status = process.wait().map_err(|e| io_err(script.as_str(), e))?;
        if !status.success() {
            return Err(LocationError::CommandFailed {
                command: script,
                status,
                stderr: String::new(),
            });
        }
        copied.map_err(|e| io_err(script, e))
    }

    fn read_metadata(&self, dir: &Path) -> Result<Vec<u8>, LocationError> {
        self.transport
            .capture(&format!("cat {}", self.metadata_path(dir)))
    }

    fn write_metadata(&self, dir: &Path, contents: &[u8]) -> Result<(), LocationError> {
        self.transport
            .feed(&format!("cat > {}", self.metadata_path(dir)), contents)
    }
}

fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}
