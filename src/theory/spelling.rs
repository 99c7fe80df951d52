// Key-aware note spelling

use super::key::Mode;
use super::pitch::PitchClass;

/// Note names along the line of fifths, double flats to double sharps.
/// Index 15 is C.
const NAMES_BY_FIFTHS: [&str; 35] = [
    "Fbb", "Cbb", "Gbb", "Dbb", "Abb", "Ebb", "Bbb", //
    "Fb", "Cb", "Gb", "Db", "Ab", "Eb", "Bb", //
    "F", "C", "G", "D", "A", "E", "B", //
    "F#", "C#", "G#", "D#", "A#", "E#", "B#", //
    "Fx", "Cx", "Gx", "Dx", "Ax", "Ex", "Bx",
];

const C_ON_FIFTHS: i32 = 15;

/// Position on the line of fifths of each semitone above the tonic
const DEGREE_FIFTHS: [i32; 12] = [0, -5, 2, -3, 4, -1, 6, 1, -4, 3, -2, 5];

/// Position on the line of fifths of each major tonic (flats for the black keys, except F#)
const TONIC_FIFTHS: [i32; 12] = [0, -5, 2, -3, 4, -1, -6, 1, -4, 3, -2, 5];

const ENHARMONIC_NAMES: [&str; 12] = [
    "C", "Db/C#", "D", "Eb/D#", "E", "F", "Gb/F#", "G", "Ab/G#", "A", "Bb/A#", "B",
];

/// Spells the twelve pitch classes the way a major key signature would.
///
/// Minor keys borrow the spelling of their relative major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpelling {
    tonic: PitchClass,
    offset: i32,
}

impl KeySpelling {
    pub fn major(tonic: PitchClass) -> Self {
        Self {
            tonic,
            offset: TONIC_FIFTHS[tonic.index()],
        }
    }

    pub fn for_key(tonic: PitchClass, mode: Mode) -> Self {
        match mode {
            Mode::Major => Self::major(tonic),
            Mode::Minor => {
                let relative = Self::major(tonic.transpose(3));
                Self { tonic, ..relative }
            }
        }
    }

    pub fn tonic(&self) -> PitchClass {
        self.tonic
    }

    /// Name of `pc` in this key.
    pub fn name_of(&self, pc: PitchClass) -> &'static str {
        let major_tonic = self.major_tonic();
        let degree = pc.semitones_above(major_tonic) as usize;
        NAMES_BY_FIFTHS[(C_ON_FIFTHS + self.offset + DEGREE_FIFTHS[degree]) as usize]
    }

    pub fn tonic_name(&self) -> &'static str {
        self.name_of(self.tonic)
    }

    /// Names of the notes 0..11 semitones above the tonic.
    pub fn chromatic_names(&self) -> [&'static str; 12] {
        let mut names = [""; 12];
        for (k, name) in names.iter_mut().enumerate() {
            *name = self.name_of(self.tonic.transpose(k as i32));
        }
        names
    }

    /// Twelve consecutive fifths starting at the major tonic.
    pub fn fifth_names(&self) -> [&'static str; 12] {
        let mut names = [""; 12];
        for (p, name) in names.iter_mut().enumerate() {
            *name = NAMES_BY_FIFTHS[(C_ON_FIFTHS + self.offset + p as i32) as usize];
        }
        names
    }

    /// Both spellings of each black key, starting at the tonic.
    pub fn enharmonic_names(&self) -> [&'static str; 12] {
        let mut names = [""; 12];
        for (k, name) in names.iter_mut().enumerate() {
            *name = ENHARMONIC_NAMES[self.tonic.transpose(k as i32).index()];
        }
        names
    }

    fn major_tonic(&self) -> PitchClass {
        // Inverse of the TONIC_FIFTHS lookup: 7 semitones per fifth
        PitchClass::wrapping(self.offset * 7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(value: u8) -> PitchClass {
        PitchClass::root(value).unwrap()
    }

    #[test]
    fn test_c_major_chromatic() {
        let names = KeySpelling::major(PitchClass::C).chromatic_names();
        assert_eq!(
            names,
            ["C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"]
        );
    }

    #[test]
    fn test_flat_and_sharp_keys() {
        assert_eq!(KeySpelling::major(pc(10)).tonic_name(), "Bb");
        assert_eq!(KeySpelling::major(pc(6)).tonic_name(), "Gb");
        assert_eq!(KeySpelling::major(pc(4)).chromatic_names()[1], "F");
        // E major: D# is the leading tone
        assert_eq!(KeySpelling::major(pc(4)).name_of(pc(3)), "D#");
        // Db major: Gb is the fourth, G the raised fourth
        assert_eq!(KeySpelling::major(pc(1)).name_of(pc(6)), "Gb");
        assert_eq!(KeySpelling::major(pc(1)).name_of(pc(7)), "G");
    }

    #[test]
    fn test_minor_uses_relative_major() {
        let f_sharp_minor = KeySpelling::for_key(pc(6), Mode::Minor);
        assert_eq!(f_sharp_minor.tonic_name(), "F#");
        assert_eq!(f_sharp_minor.name_of(pc(1)), "C#");

        let e_flat_minor = KeySpelling::for_key(pc(3), Mode::Minor);
        assert_eq!(e_flat_minor.tonic_name(), "Eb");
        assert_eq!(e_flat_minor.name_of(pc(11)), "Cb");
    }

    #[test]
    fn test_fifth_names_from_g() {
        let names = KeySpelling::major(pc(7)).fifth_names();
        assert_eq!(&names[..4], &["G", "D", "A", "E"]);
    }

    #[test]
    fn test_enharmonic_names_rotate() {
        let names = KeySpelling::major(pc(1)).enharmonic_names();
        assert_eq!(names[0], "Db/C#");
        assert_eq!(names[11], "C");
    }
}
