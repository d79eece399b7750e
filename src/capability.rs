//! Which metadata fields each platform can supply at all.

use crate::types::FieldSet;

/// Platform families with distinct metadata capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Windows, via the NT directory query.
    Windows,
    /// Linux and Android.
    Linux,
    /// macOS, iOS and FreeBSD: `stat` also carries flags, generation and birth time.
    Bsd,
    /// Any other POSIX system.
    Posix,
}

impl Platform {
    /// The platform this crate was built for.
    pub const fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(any(target_os = "linux", target_os = "android")) {
            Platform::Linux
        } else if cfg!(any(target_os = "macos", target_os = "ios", target_os = "freebsd")) {
            Platform::Bsd
        } else {
            Platform::Posix
        }
    }
}

/// Fields `platform` can ever supply. Not every filesystem fills all of them.
pub const fn supported_fields(platform: Platform) -> FieldSet {
    let stat = FieldSet::DEV
        .union(FieldSet::INO)
        .union(FieldSet::TYPE)
        .union(FieldSet::MODE)
        .union(FieldSet::NLINK)
        .union(FieldSet::UID)
        .union(FieldSet::GID)
        .union(FieldSet::RDEV)
        .union(FieldSet::ATIM)
        .union(FieldSet::MTIM)
        .union(FieldSet::CTIM)
        .union(FieldSet::SIZE)
        .union(FieldSet::ALLOCATED)
        .union(FieldSet::BLOCKS)
        .union(FieldSet::BLKSIZE);

    match platform {
        // No link count or generation: neither the directory record nor the
        // single-entry re-query carries them.
        Platform::Windows => FieldSet::INO
            .union(FieldSet::TYPE)
            .union(FieldSet::ATIM)
            .union(FieldSet::MTIM)
            .union(FieldSet::CTIM)
            .union(FieldSet::SIZE)
            .union(FieldSet::ALLOCATED)
            .union(FieldSet::BIRTHTIM),
        // Linux stat() has no flags, generation or birth time.
        Platform::Linux | Platform::Posix => stat,
        Platform::Bsd => FieldSet::all(),
    }
}

/// Fields the running platform can ever supply.
pub const fn metadata_supported() -> FieldSet {
    supported_fields(Platform::current())
}
