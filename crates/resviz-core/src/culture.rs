use std::path::Path;

use unic_langid::LanguageIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFileName {
    pub base_name: String,
    pub culture: Option<String>,
}

impl ResourceFileName {
    pub fn parse(path: impl AsRef<Path>) -> Self {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|value| value.to_string_lossy().into_owned())
            .unwrap_or_default();

        match stem.rsplit_once('.') {
            Some((base, suffix)) if !base.is_empty() && is_culture_tag(suffix) => Self {
                base_name: base.to_owned(),
                culture: Some(suffix.to_owned()),
            },
            _ => Self {
                base_name: stem,
                culture: None,
            },
        }
    }
}

// Language subtags .NET ships cultures for. A file-name suffix only counts
// as a culture when its language is one of these, so `Errors.Api.resx`
// stays a neutral table named `Errors.Api`.
const KNOWN_LANGUAGES: &[&str] = &[
    "aa", "ab", "ae", "af", "agq", "ak", "am", "an", "ar", "arn", "ars", "as", "asa", "ast",
    "av", "ay", "az", "ba", "bas", "be", "bem", "bez", "bg", "bh", "bi", "bm", "bn", "bo",
    "br", "brx", "bs", "byn", "ca", "ccp", "ce", "ceb", "cgg", "ch", "chr", "ckb", "co", "cr",
    "cs", "cu", "cv", "cy", "da", "dav", "de", "dje", "dsb", "dua", "dv", "dyo", "dz", "ee",
    "el", "en", "eo", "es", "et", "eu", "ewo", "fa", "ff", "fi", "fil", "fj", "fo", "fr",
    "fur", "fy", "ga", "gd", "gl", "gn", "gsw", "gu", "guz", "gv", "ha", "haw", "he", "hi",
    "ho", "hr", "hsb", "ht", "hu", "hy", "hz", "ia", "ibb", "id", "ie", "ig", "ii", "ik", "io",
    "is", "it", "iu", "ja", "jgo", "jmc", "jv", "ka", "kab", "kam", "kde", "kea", "kg", "khq",
    "ki", "kj", "kk", "kkj", "kl", "kln", "km", "kn", "ko", "kok", "kr", "ks", "ksb", "ksf",
    "ksh", "ku", "kv", "kw", "ky", "la", "lag", "lb", "lg", "li", "lkt", "ln", "lo", "lrc",
    "lt", "lu", "luo", "luy", "lv", "mas", "mer", "mfe", "mg", "mgh", "mgo", "mh", "mi", "mk",
    "ml", "mn", "moh", "mr", "ms", "mt", "mua", "my", "mzn", "na", "naq", "nb", "nd", "nds",
    "ne", "ng", "nl", "nmg", "nn", "nnh", "no", "nqo", "nr", "nso", "nus", "nv", "ny", "nyn",
    "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "prg", "prs", "ps", "pt", "qu", "quc",
    "quz", "rm", "rn", "ro", "rof", "ru", "rw", "rwk", "sa", "sah", "saq", "sbp", "sc", "sd",
    "se", "seh", "ses", "sg", "shi", "si", "sk", "sl", "sm", "sma", "smj", "smn", "sms", "sn",
    "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "syr", "ta", "te", "teo", "tg", "th", "ti",
    "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "tzm", "ug", "uk", "ur", "uz", "vai",
    "ve", "vi", "vo", "vun", "wa", "wae", "wal", "wo", "xh", "xog", "yav", "yi", "yo", "yue",
    "za", "zgh", "zh", "zu",
];

pub fn is_culture_tag(tag: &str) -> bool {
    let Ok(id) = tag.parse::<LanguageIdentifier>() else {
        return false;
    };

    let language = id.language.as_str().to_ascii_lowercase();
    KNOWN_LANGUAGES.binary_search(&language.as_str()).is_ok()
}

pub fn is_resource_of_interest(path: impl AsRef<Path>, preferred_culture: &str) -> bool {
    match ResourceFileName::parse(path).culture {
        None => true,
        Some(culture) => {
            !preferred_culture.is_empty() && culture.eq_ignore_ascii_case(preferred_culture)
        }
    }
}
