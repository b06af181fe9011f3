//! EBCDIC code page 1047 translation.
//!
//! The code page is defined by a table of entries carrying the EBCDIC
//! byte, the equivalent ASCII byte where one exists, and the Unicode code
//! point for the positions outside ASCII. Lookup tables are derived from
//! it once per process and cached; derivation prefers the explicit Unicode
//! point over the ASCII byte when both are set.
//!
//! Characters with no entry encode to [`NULL`], and bytes with no entry
//! decode to NUL, so the translation is round-trippable exactly on the
//! printable set.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Fallback byte for code points outside the table.
pub const NULL: u8 = 0x00;

struct Entry {
    ebcdic: u8,
    ascii: u8,
    unicode: Option<char>,
    description: &'static str,
}

const fn e(ebcdic: u8, ascii: u8, unicode: Option<char>, description: &'static str) -> Entry {
    Entry {
        ebcdic,
        ascii,
        unicode,
        description,
    }
}

#[rustfmt::skip]
const CP1047: &[Entry] = &[
    e(0x00, 0x00, None, "nul"),
    e(0x01, 0x01, None, "soh"),
    e(0x02, 0x02, None, "stx"),
    e(0x03, 0x03, None, "etx"),
    e(0x04, 0x00, Some('\u{9C}'), "st"),
    e(0x05, 0x09, None, "ht"),
    e(0x06, 0x00, Some('\u{86}'), "ssa"),
    e(0x07, 0x7F, None, "del"),
    e(0x08, 0x00, Some('\u{97}'), "epa"),
    e(0x09, 0x00, Some('\u{8D}'), "ri"),
    e(0x0A, 0x00, Some('\u{8E}'), "ss2"),
    e(0x0B, 0x0B, None, "vt"),
    e(0x0C, 0x0C, None, "ff"),
    e(0x0D, 0x0D, None, "cr"),
    e(0x0E, 0x0E, None, "so"),
    e(0x0F, 0x0F, None, "si"),
    e(0x10, 0x10, None, "dle"),
    e(0x11, 0x11, None, "dc1"),
    e(0x12, 0x12, None, "dc2"),
    e(0x13, 0x13, None, "dc3"),
    e(0x14, 0x00, Some('\u{9D}'), "osc"),
    e(0x15, 0x00, Some('\u{85}'), "nel"),
    e(0x16, 0x08, None, "bs"),
    e(0x17, 0x00, Some('\u{87}'), "esa"),
    e(0x18, 0x18, None, "can"),
    e(0x19, 0x19, None, "em"),
    e(0x1A, 0x00, Some('\u{92}'), "pu2"),
    e(0x1B, 0x00, Some('\u{8F}'), "ss3"),
    e(0x1C, 0x1C, None, "fs"),
    e(0x1D, 0x1D, None, "gs"),
    e(0x1E, 0x1E, None, "rs"),
    e(0x1F, 0x1F, None, "us"),
    e(0x20, 0x00, Some('\u{80}'), "pad"),
    e(0x21, 0x00, Some('\u{81}'), "hop"),
    e(0x22, 0x00, Some('\u{82}'), "bph"),
    e(0x23, 0x00, Some('\u{83}'), "nbh"),
    e(0x24, 0x00, Some('\u{84}'), "ind"),
    e(0x25, 0x0A, None, "lf"),
    e(0x26, 0x17, None, "etb"),
    e(0x27, 0x1B, None, "esc"),
    e(0x28, 0x00, Some('\u{88}'), "hts"),
    e(0x29, 0x00, Some('\u{89}'), "htj"),
    e(0x2A, 0x00, Some('\u{8A}'), "vts"),
    e(0x2B, 0x00, Some('\u{8B}'), "pld"),
    e(0x2C, 0x00, Some('\u{8C}'), "plu"),
    e(0x2D, 0x05, None, "enq"),
    e(0x2E, 0x06, None, "ack"),
    e(0x2F, 0x07, None, "bel"),
    e(0x30, 0x00, Some('\u{90}'), "dcs"),
    e(0x31, 0x00, Some('\u{91}'), "pu1"),
    e(0x32, 0x16, None, "syn"),
    e(0x33, 0x00, Some('\u{93}'), "sts"),
    e(0x34, 0x00, Some('\u{94}'), "cch"),
    e(0x35, 0x00, Some('\u{95}'), "mw"),
    e(0x36, 0x00, Some('\u{96}'), "spa"),
    e(0x37, 0x04, None, "eot"),
    e(0x38, 0x00, Some('\u{98}'), "sos"),
    e(0x39, 0x00, Some('\u{99}'), "sgci"),
    e(0x3A, 0x00, Some('\u{9A}'), "sci"),
    e(0x3B, 0x00, Some('\u{9B}'), "csi"),
    e(0x3C, 0x14, None, "dc4"),
    e(0x3D, 0x15, None, "nak"),
    e(0x3E, 0x00, Some('\u{9E}'), "pm"),
    e(0x3F, 0x1A, None, "sub"),
    e(0x40, b' ', None, "space"),
    e(0x41, 0x00, Some('\u{A0}'), "no-break space"),
    e(0x42, 0x00, Some('â'), "a with circumflex"),
    e(0x43, 0x00, Some('ä'), "a with diaeresis"),
    e(0x44, 0x00, Some('à'), "a with grave"),
    e(0x45, 0x00, Some('á'), "a with acute"),
    e(0x46, 0x00, Some('ã'), "a with tilde"),
    e(0x47, 0x00, Some('å'), "a with ring"),
    e(0x48, 0x00, Some('ç'), "c with cedilla"),
    e(0x49, 0x00, Some('ñ'), "n with tilde"),
    e(0x4A, 0x00, Some('¢'), "cent sign"),
    e(0x4B, b'.', None, "full stop"),
    e(0x4C, b'<', None, "less-than sign"),
    e(0x4D, b'(', None, "left parenthesis"),
    e(0x4E, b'+', None, "plus sign"),
    e(0x4F, b'|', None, "vertical line"),
    e(0x50, b'&', None, "ampersand"),
    e(0x51, 0x00, Some('é'), "e with acute"),
    e(0x52, 0x00, Some('ê'), "e with circumflex"),
    e(0x53, 0x00, Some('ë'), "e with diaeresis"),
    e(0x54, 0x00, Some('è'), "e with grave"),
    e(0x55, 0x00, Some('í'), "i with acute"),
    e(0x56, 0x00, Some('î'), "i with circumflex"),
    e(0x57, 0x00, Some('ï'), "i with diaeresis"),
    e(0x58, 0x00, Some('ì'), "i with grave"),
    e(0x59, 0x00, Some('ß'), "sharp s"),
    e(0x5A, b'!', None, "exclamation mark"),
    e(0x5B, b'$', None, "dollar sign"),
    e(0x5C, b'*', None, "asterisk"),
    e(0x5D, b')', None, "right parenthesis"),
    e(0x5E, b';', None, "semicolon"),
    e(0x5F, b'^', None, "circumflex accent"),
    e(0x60, b'-', None, "hyphen-minus"),
    e(0x61, b'/', None, "solidus"),
    e(0x62, 0x00, Some('Â'), "capital a with circumflex"),
    e(0x63, 0x00, Some('Ä'), "capital a with diaeresis"),
    e(0x64, 0x00, Some('À'), "capital a with grave"),
    e(0x65, 0x00, Some('Á'), "capital a with acute"),
    e(0x66, 0x00, Some('Ã'), "capital a with tilde"),
    e(0x67, 0x00, Some('Å'), "capital a with ring"),
    e(0x68, 0x00, Some('Ç'), "capital c with cedilla"),
    e(0x69, 0x00, Some('Ñ'), "capital n with tilde"),
    e(0x6A, 0x00, Some('¦'), "broken bar"),
    e(0x6B, b',', None, "comma"),
    e(0x6C, b'%', None, "percent sign"),
    e(0x6D, b'_', None, "low line"),
    e(0x6E, b'>', None, "greater-than sign"),
    e(0x6F, b'?', None, "question mark"),
    e(0x70, 0x00, Some('ø'), "o with stroke"),
    e(0x71, 0x00, Some('É'), "capital e with acute"),
    e(0x72, 0x00, Some('Ê'), "capital e with circumflex"),
    e(0x73, 0x00, Some('Ë'), "capital e with diaeresis"),
    e(0x74, 0x00, Some('È'), "capital e with grave"),
    e(0x75, 0x00, Some('Í'), "capital i with acute"),
    e(0x76, 0x00, Some('Î'), "capital i with circumflex"),
    e(0x77, 0x00, Some('Ï'), "capital i with diaeresis"),
    e(0x78, 0x00, Some('Ì'), "capital i with grave"),
    e(0x79, b'`', None, "grave accent"),
    e(0x7A, b':', None, "colon"),
    e(0x7B, b'#', None, "number sign"),
    e(0x7C, b'@', None, "commercial at"),
    e(0x7D, b'\'', None, "apostrophe"),
    e(0x7E, b'=', None, "equals sign"),
    e(0x7F, b'"', None, "quotation mark"),
    e(0x80, 0x00, Some('Ø'), "capital o with stroke"),
    e(0x81, b'a', None, "a"),
    e(0x82, b'b', None, "b"),
    e(0x83, b'c', None, "c"),
    e(0x84, b'd', None, "d"),
    e(0x85, b'e', None, "e"),
    e(0x86, b'f', None, "f"),
    e(0x87, b'g', None, "g"),
    e(0x88, b'h', None, "h"),
    e(0x89, b'i', None, "i"),
    e(0x8A, 0x00, Some('«'), "left guillemet"),
    e(0x8B, 0x00, Some('»'), "right guillemet"),
    e(0x8C, 0x00, Some('ð'), "eth"),
    e(0x8D, 0x00, Some('ý'), "y with acute"),
    e(0x8E, 0x00, Some('þ'), "thorn"),
    e(0x8F, 0x00, Some('±'), "plus-minus sign"),
    e(0x90, 0x00, Some('°'), "degree sign"),
    e(0x91, b'j', None, "j"),
    e(0x92, b'k', None, "k"),
    e(0x93, b'l', None, "l"),
    e(0x94, b'm', None, "m"),
    e(0x95, b'n', None, "n"),
    e(0x96, b'o', None, "o"),
    e(0x97, b'p', None, "p"),
    e(0x98, b'q', None, "q"),
    e(0x99, b'r', None, "r"),
    e(0x9A, 0x00, Some('ª'), "feminine ordinal indicator"),
    e(0x9B, 0x00, Some('º'), "masculine ordinal indicator"),
    e(0x9C, 0x00, Some('æ'), "ae ligature"),
    e(0x9D, 0x00, Some('¸'), "cedilla"),
    e(0x9E, 0x00, Some('Æ'), "capital ae ligature"),
    e(0x9F, 0x00, Some('¤'), "currency sign"),
    e(0xA0, 0x00, Some('µ'), "micro sign"),
    e(0xA1, b'~', None, "tilde"),
    e(0xA2, b's', None, "s"),
    e(0xA3, b't', None, "t"),
    e(0xA4, b'u', None, "u"),
    e(0xA5, b'v', None, "v"),
    e(0xA6, b'w', None, "w"),
    e(0xA7, b'x', None, "x"),
    e(0xA8, b'y', None, "y"),
    e(0xA9, b'z', None, "z"),
    e(0xAA, 0x00, Some('¡'), "inverted exclamation mark"),
    e(0xAB, 0x00, Some('¿'), "inverted question mark"),
    e(0xAC, 0x00, Some('Ð'), "capital eth"),
    e(0xAD, b'[', None, "left square bracket"),
    e(0xAE, 0x00, Some('Þ'), "capital thorn"),
    e(0xAF, 0x00, Some('®'), "registered sign"),
    e(0xB0, 0x00, Some('¬'), "not sign"),
    e(0xB1, 0x00, Some('£'), "pound sign"),
    e(0xB2, 0x00, Some('¥'), "yen sign"),
    e(0xB3, 0x00, Some('·'), "middle dot"),
    e(0xB4, 0x00, Some('©'), "copyright sign"),
    e(0xB5, 0x00, Some('§'), "section sign"),
    e(0xB6, 0x00, Some('¶'), "pilcrow sign"),
    e(0xB7, 0x00, Some('¼'), "one quarter"),
    e(0xB8, 0x00, Some('½'), "one half"),
    e(0xB9, 0x00, Some('¾'), "three quarters"),
    e(0xBA, 0x00, Some('Ý'), "capital y with acute"),
    e(0xBB, 0x00, Some('¨'), "diaeresis"),
    e(0xBC, 0x00, Some('¯'), "macron"),
    e(0xBD, b']', None, "right square bracket"),
    e(0xBE, 0x00, Some('´'), "acute accent"),
    e(0xBF, 0x00, Some('×'), "multiplication sign"),
    e(0xC0, b'{', None, "left curly bracket"),
    e(0xC1, b'A', None, "capital a"),
    e(0xC2, b'B', None, "capital b"),
    e(0xC3, b'C', None, "capital c"),
    e(0xC4, b'D', None, "capital d"),
    e(0xC5, b'E', None, "capital e"),
    e(0xC6, b'F', None, "capital f"),
    e(0xC7, b'G', None, "capital g"),
    e(0xC8, b'H', None, "capital h"),
    e(0xC9, b'I', None, "capital i"),
    e(0xCA, 0x00, Some('\u{AD}'), "soft hyphen"),
    e(0xCB, 0x00, Some('ô'), "o with circumflex"),
    e(0xCC, 0x00, Some('ö'), "o with diaeresis"),
    e(0xCD, 0x00, Some('ò'), "o with grave"),
    e(0xCE, 0x00, Some('ó'), "o with acute"),
    e(0xCF, 0x00, Some('õ'), "o with tilde"),
    e(0xD0, b'}', None, "right curly bracket"),
    e(0xD1, b'J', None, "capital j"),
    e(0xD2, b'K', None, "capital k"),
    e(0xD3, b'L', None, "capital l"),
    e(0xD4, b'M', None, "capital m"),
    e(0xD5, b'N', None, "capital n"),
    e(0xD6, b'O', None, "capital o"),
    e(0xD7, b'P', None, "capital p"),
    e(0xD8, b'Q', None, "capital q"),
    e(0xD9, b'R', None, "capital r"),
    e(0xDA, 0x00, Some('¹'), "superscript one"),
    e(0xDB, 0x00, Some('û'), "u with circumflex"),
    e(0xDC, 0x00, Some('ü'), "u with diaeresis"),
    e(0xDD, 0x00, Some('ù'), "u with grave"),
    e(0xDE, 0x00, Some('ú'), "u with acute"),
    e(0xDF, 0x00, Some('ÿ'), "y with diaeresis"),
    e(0xE0, b'\\', None, "reverse solidus"),
    e(0xE1, 0x00, Some('÷'), "division sign"),
    e(0xE2, b'S', None, "capital s"),
    e(0xE3, b'T', None, "capital t"),
    e(0xE4, b'U', None, "capital u"),
    e(0xE5, b'V', None, "capital v"),
    e(0xE6, b'W', None, "capital w"),
    e(0xE7, b'X', None, "capital x"),
    e(0xE8, b'Y', None, "capital y"),
    e(0xE9, b'Z', None, "capital z"),
    e(0xEA, 0x00, Some('²'), "superscript two"),
    e(0xEB, 0x00, Some('Ô'), "capital o with circumflex"),
    e(0xEC, 0x00, Some('Ö'), "capital o with diaeresis"),
    e(0xED, 0x00, Some('Ò'), "capital o with grave"),
    e(0xEE, 0x00, Some('Ó'), "capital o with acute"),
    e(0xEF, 0x00, Some('Õ'), "capital o with tilde"),
    e(0xF0, b'0', None, "zero"),
    e(0xF1, b'1', None, "one"),
    e(0xF2, b'2', None, "two"),
    e(0xF3, b'3', None, "three"),
    e(0xF4, b'4', None, "four"),
    e(0xF5, b'5', None, "five"),
    e(0xF6, b'6', None, "six"),
    e(0xF7, b'7', None, "seven"),
    e(0xF8, b'8', None, "eight"),
    e(0xF9, b'9', None, "nine"),
    e(0xFA, 0x00, Some('³'), "superscript three"),
    e(0xFB, 0x00, Some('Û'), "capital u with circumflex"),
    e(0xFC, 0x00, Some('Ü'), "capital u with diaeresis"),
    e(0xFD, 0x00, Some('Ù'), "capital u with grave"),
    e(0xFE, 0x00, Some('Ú'), "capital u with acute"),
    e(0xFF, 0x00, Some('\u{9F}'), "apc"),
];

struct Tables {
    encode: HashMap<char, u8>,
    decode: HashMap<u8, char>,
}

impl Entry {
    /// The unicode point wins over the ascii byte when both are set.
    fn code_point(&self) -> char {
        self.unicode.unwrap_or(self.ascii as char)
    }
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut encode = HashMap::with_capacity(CP1047.len());
        let mut decode = HashMap::with_capacity(CP1047.len());
        for entry in CP1047 {
            encode.entry(entry.code_point()).or_insert(entry.ebcdic);
            decode.entry(entry.ebcdic).or_insert(entry.code_point());
        }
        Tables { encode, decode }
    })
}

/// Encodes a string into EBCDIC bytes. Code points outside the table
/// become [`NULL`].
pub fn encode(input: &str) -> Vec<u8> {
    let encode = &tables().encode;
    input
        .chars()
        .map(|c| encode.get(&c).copied().unwrap_or(NULL))
        .collect()
}

/// Decodes EBCDIC bytes into a string. Bytes outside the table become NUL.
pub fn decode(input: &[u8]) -> String {
    let decode = &tables().decode;
    input
        .iter()
        .map(|b| decode.get(b).copied().unwrap_or('\0'))
        .collect()
}

/// Human-readable name of an EBCDIC byte, for diagnostics.
pub fn describe(ebcdic: u8) -> Option<&'static str> {
    CP1047
        .iter()
        .find(|entry| entry.ebcdic == ebcdic)
        .map(|entry| entry.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_set_round_trips() {
        let input = "qwertyuiop1234567890asdfghjklñ´çzxcvbnm,.-`+";
        assert_eq!(decode(&encode(input)), input);
    }

    #[test]
    fn unknown_code_points_encode_to_null() {
        assert_eq!(encode("鲸鱼歌"), vec![NULL, NULL, NULL]);
    }

    #[test]
    fn digits_map_to_the_f_row() {
        assert_eq!(encode("0123456789"), (0xF0..=0xF9).collect::<Vec<u8>>());
        assert_eq!(decode(&[0xF1, 0xF2, 0xF3, 0xF4]), "1234");
    }

    #[test]
    fn lowercase_and_uppercase_rows() {
        assert_eq!(encode("abc"), vec![0x81, 0x82, 0x83]);
        assert_eq!(encode("ABC"), vec![0xC1, 0xC2, 0xC3]);
        assert_eq!(encode("ebcdic"), vec![0x85, 0x82, 0x83, 0x84, 0x89, 0x83]);
    }

    #[test]
    fn table_covers_all_byte_values() {
        assert_eq!(CP1047.len(), 256);
        for (n, entry) in CP1047.iter().enumerate() {
            assert_eq!(entry.ebcdic as usize, n);
        }
    }

    #[test]
    fn descriptions_are_addressable() {
        assert_eq!(describe(0x40), Some("space"));
        assert_eq!(describe(0xF0), Some("zero"));
    }
}
