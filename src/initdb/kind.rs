use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use xz2::read::XzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Wrap `reader` so it yields decompressed bytes.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFileKind {
    Shell,
    Sql(Compression),
    Unrecognized,
}

const SUFFIXES: &[(&str, InitFileKind)] = &[
    (".sh", InitFileKind::Shell),
    (".sql", InitFileKind::Sql(Compression::None)),
    (".sql.gz", InitFileKind::Sql(Compression::Gzip)),
    (".sql.bz2", InitFileKind::Sql(Compression::Bzip2)),
    (".sql.xz", InitFileKind::Sql(Compression::Xz)),
];

/// Classify by file name suffix, case-sensitively.
pub fn classify(path: &Path) -> InitFileKind {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return InitFileKind::Unrecognized;
    };
    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map_or(InitFileKind::Unrecognized, |(_, kind)| *kind)
}
