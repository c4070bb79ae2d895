// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use crate::error::LoadError;

/// Opens a bytecode file for loading.
pub fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Copies the whole of `source` into `memory` and zeroes whatever is left
/// over, returning the number of program bytes.
///
/// A source with more bytes than `memory` holds is rejected rather than cut
/// short.
pub fn load_into<R: Read>(
    memory: &mut [u8],
    mut source: R,
) -> Result<usize, LoadError> {
    let mut filled = 0;
    while filled < memory.len() {
        match source.read(&mut memory[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error.into()),
        }
    }

    if filled == memory.len() && has_more(&mut source)? {
        return Err(LoadError::ProgramTooLarge {
            capacity: memory.len(),
        });
    }

    memory[filled..].fill(0);
    Ok(filled)
}

fn has_more<R: Read>(source: &mut R) -> io::Result<bool> {
    let mut probe = [0; 1];
    loop {
        match source.read(&mut probe) {
            Ok(read) => return Ok(read > 0),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use super::load_into;
    use crate::error::LoadError;

    /// Hands out one byte per call and is interrupted before each.
    struct Trickle<'a> {
        bytes: &'a [u8],
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::ErrorKind::Interrupted.into());
            }
            match self.bytes.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.bytes = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    #[test]
    fn loads_and_zeroes_tail() {
        let mut memory = [0xaa; 8];
        let loaded = load_into(&mut memory, &[1u8, 2, 3][..])
            .expect("program should fit");
        assert_eq!(3, loaded);
        assert_eq!([1, 2, 3, 0, 0, 0, 0, 0], memory);
    }

    #[test]
    fn exact_fit_is_accepted() {
        let mut memory = [0; 4];
        let loaded = load_into(&mut memory, &[9u8; 4][..])
            .expect("program should fit");
        assert_eq!(4, loaded);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut memory = [0; 4];
        let result = load_into(&mut memory, &[9u8; 5][..]);
        assert!(matches!(
            result,
            Err(LoadError::ProgramTooLarge { capacity: 4 })
        ));
    }

    #[test]
    fn retries_interrupted_reads() {
        let mut memory = [0; 4];
        let source = Trickle {
            bytes: &[5, 6, 7],
            interrupt: false,
        };
        let loaded = load_into(&mut memory, source).expect("load should succeed");
        assert_eq!(3, loaded);
        assert_eq!([5, 6, 7, 0], memory);
    }

    #[test]
    fn read_errors_are_reported() {
        let mut memory = [0; 4];
        assert!(matches!(
            load_into(&mut memory, Broken),
            Err(LoadError::Io(_))
        ));
    }
}
