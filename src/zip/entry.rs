use super::structures::CompressionMethod;

/// Host systems recorded in the upper byte of "version made by"
const HOST_MSDOS: u8 = 0;
const HOST_UNIX: u8 = 3;
const HOST_NTFS: u8 = 10;
const HOST_VFAT: u8 = 14;
const HOST_MACOSX: u8 = 19;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

const DOS_READONLY: u32 = 0x01;
const DOS_DIRECTORY: u32 = 0x10;

/// General purpose flag bit marking an encrypted entry
const FLAG_ENCRYPTED: u16 = 0x0001;

/// One record of the central directory
#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// Stored name, slash-delimited
    pub name: String,
    pub version_made_by: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub external_attrs: u32,
    pub lfh_offset: u64,
}

impl ZipEntry {
    fn host(&self) -> u8 {
        (self.version_made_by >> 8) as u8
    }

    /// Full Unix mode (type and permission bits), if the archiver recorded one
    pub fn unix_mode(&self) -> Option<u32> {
        match self.host() {
            HOST_UNIX | HOST_MACOSX => {
                let mode = self.external_attrs >> 16;
                (mode != 0).then_some(mode)
            }
            _ => None,
        }
    }

    fn dos_attrs(&self) -> Option<u32> {
        match self.host() {
            HOST_MSDOS | HOST_NTFS | HOST_VFAT => Some(self.external_attrs & 0xFF),
            _ => None,
        }
    }

    pub fn is_directory(&self) -> bool {
        if self.name.ends_with('/') {
            return true;
        }
        if let Some(mode) = self.unix_mode() {
            return mode & S_IFMT == S_IFDIR;
        }
        self.dos_attrs()
            .is_some_and(|attrs| attrs & DOS_DIRECTORY != 0)
    }

    /// Permission bits recorded for the entry, if any.
    ///
    /// Unix archivers store them directly. A DOS read-only file maps to
    /// `0o444`. Everything else (including a Unix record with no permission
    /// bits) records nothing, and the extracted item keeps the umask-derived
    /// default.
    pub fn permissions(&self) -> Option<u32> {
        if let Some(mode) = self.unix_mode() {
            if mode & 0o777 != 0 {
                return Some(mode & 0o7777);
            }
        }

        let readonly = self
            .dos_attrs()
            .is_some_and(|attrs| attrs & DOS_READONLY != 0);
        (readonly && !self.is_directory()).then_some(0o444)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, host: u8, external_attrs: u32) -> ZipEntry {
        ZipEntry {
            name: name.to_string(),
            version_made_by: (host as u16) << 8 | 20,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attrs,
            lfh_offset: 0,
        }
    }

    #[test]
    fn unix_mode_bits_are_used_verbatim() {
        let file = entry("bin/tool", HOST_UNIX, 0o100750 << 16);
        assert_eq!(file.permissions(), Some(0o750));
        assert!(!file.is_directory());

        let setuid = entry("bin/su", HOST_UNIX, 0o104755 << 16);
        assert_eq!(setuid.permissions(), Some(0o4755));
    }

    #[test]
    fn unix_directory_without_trailing_slash() {
        let dir = entry("share", HOST_UNIX, 0o040700 << 16);
        assert!(dir.is_directory());
        assert_eq!(dir.permissions(), Some(0o700));
    }

    #[test]
    fn dos_attributes_record_only_read_only() {
        let file = entry("README.TXT", HOST_MSDOS, 0x20);
        assert_eq!(file.permissions(), None);

        let readonly = entry("LOCKED.TXT", HOST_NTFS, DOS_READONLY);
        assert_eq!(readonly.permissions(), Some(0o444));

        let dir = entry("DOCS", HOST_VFAT, DOS_DIRECTORY | DOS_READONLY);
        assert!(dir.is_directory());
        assert_eq!(dir.permissions(), None);
    }

    #[test]
    fn unix_record_without_permissions_records_nothing() {
        let file = entry("data.bin", HOST_UNIX, 0);
        assert_eq!(file.permissions(), None);

        let dir = entry("data/", HOST_UNIX, 0o040000 << 16);
        assert_eq!(dir.permissions(), None);
    }

    #[test]
    fn encrypted_flag() {
        let mut e = entry("secret", HOST_UNIX, 0o100600 << 16);
        assert!(!e.is_encrypted());
        e.flags |= FLAG_ENCRYPTED;
        assert!(e.is_encrypted());
    }
}
