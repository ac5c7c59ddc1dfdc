//! URL slug generation for categories and products.

/// Build a URL slug from a display name.
///
/// Turkish letters are transliterated (`ç`→`c`, `ğ`→`g`, `ı`/`İ`→`i`, `ö`→`o`,
/// `ş`→`s`, `ü`→`u`), other accented Latin letters lose their accent, and
/// every run of characters outside `[a-z0-9]` collapses to a single `-`.
/// Returns `fallback` when nothing is left.
///
/// ```
/// use zeytin_core::slug::slugify;
///
/// assert_eq!(slugify("Sızma Zeytinyağı 5 Lt", "urun"), "sizma-zeytinyagi-5-lt");
/// assert_eq!(slugify("  ***  ", "kategori"), "kategori");
/// ```
#[must_use]
pub fn slugify(value: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    let mut push = |ch: char, slug: &mut String| {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    };

    for ch in value.chars() {
        if let Some(mapped) = turkish(ch) {
            push(mapped, &mut slug);
            continue;
        }
        for lower in ch.to_lowercase() {
            if is_combining_mark(lower) {
                continue;
            }
            push(fold_accent(lower), &mut slug);
        }
    }

    if slug.is_empty() {
        fallback.to_owned()
    } else {
        slug
    }
}

/// Candidate slugs in the order they should be tried: `base`, `base-2`,
/// `base-3`, ...
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_owned()).chain((2_u32..).map(move |n| format!("{base}-{n}")))
}

const fn turkish(ch: char) -> Option<char> {
    match ch {
        'Ç' | 'ç' => Some('c'),
        'Ğ' | 'ğ' => Some('g'),
        'İ' | 'I' | 'ı' | 'i' => Some('i'),
        'Ö' | 'ö' => Some('o'),
        'Ş' | 'ş' => Some('s'),
        'Ü' | 'ü' => Some('u'),
        _ => None,
    }
}

const fn is_combining_mark(ch: char) -> bool {
    matches!(ch, '\u{0300}'..='\u{036f}')
}

/// Strip the accent from a lowercase Latin letter that decomposes into a base
/// letter plus combining marks.
const fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ć' | 'ĉ' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ģ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ō' | 'ő' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù' | 'ú' | 'û' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_transliteration() {
        assert_eq!(slugify("Çiğ Gıda Ürünleri", "x"), "cig-gida-urunleri");
        assert_eq!(slugify("İZMİR ŞİŞE", "x"), "izmir-sise");
        assert_eq!(slugify("Yeşil Zeytin", "x"), "yesil-zeytin");
    }

    #[test]
    fn test_other_accents_are_folded() {
        assert_eq!(slugify("Crème Brûlée", "x"), "creme-brulee");
        assert_eq!(slugify("Señor Café", "x"), "senor-cafe");
    }

    #[test]
    fn test_combining_marks_are_dropped() {
        assert_eq!(slugify("Cafe\u{0301} Noir", "x"), "cafe-noir");
    }

    #[test]
    fn test_separator_runs_collapse_and_trim() {
        assert_eq!(slugify("--Gemlik  /  Siyah__Zeytin--", "x"), "gemlik-siyah-zeytin");
        assert_eq!(slugify("500 gr.", "x"), "500-gr");
    }

    #[test]
    fn test_unmappable_letters_become_separators() {
        assert_eq!(slugify("Øl Straße", "x"), "l-stra-e");
    }

    #[test]
    fn test_fallback_when_empty() {
        assert_eq!(slugify("", "urun"), "urun");
        assert_eq!(slugify("日本", "kategori"), "kategori");
    }

    #[test]
    fn test_slug_candidates() {
        let candidates: Vec<String> = slug_candidates("yesil-zeytin").take(3).collect();
        assert_eq!(
            candidates,
            vec!["yesil-zeytin", "yesil-zeytin-2", "yesil-zeytin-3"]
        );
    }
}
