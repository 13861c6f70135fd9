/// Simple RGB color independent of egui types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Format as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Utility for parsing color strings: named colors, `#rgb`, `#rrggbb` or
/// `[r, g, b]` float arrays in the 0..1 range.
pub fn parse_color(val: &str) -> Option<Rgb> {
    let val = val.trim();
    if val.starts_with('[') && val.ends_with(']') {
        // e.g. [1.0, 0.411765, 0.380392]
        let inner = &val[1..val.len() - 1];
        let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();
        if parts.len() == 3 {
            let channel = |s: &str| {
                let f = s.parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
                (f * 255.0).round() as u8
            };
            Some(Rgb(channel(parts[0]), channel(parts[1]), channel(parts[2])))
        } else {
            None
        }
    } else if let Some(hex) = val.strip_prefix('#') {
        parse_hex(hex)
    } else {
        match val.to_ascii_lowercase().as_str() {
            "white" => Some(Rgb(0xff, 0xff, 0xff)),
            "black" => Some(Rgb(0x00, 0x00, 0x00)),
            "red" => Some(Rgb(0xff, 0x00, 0x00)),
            "green" => Some(Rgb(0x00, 0x80, 0x00)),
            "blue" => Some(Rgb(0x00, 0x00, 0xff)),
            "yellow" => Some(Rgb(0xff, 0xff, 0x00)),
            "orange" => Some(Rgb(0xff, 0xa5, 0x00)),
            "steelblue" => Some(Rgb(0x46, 0x82, 0xb4)),
            "lightgray" | "lightgrey" => Some(Rgb(0xd3, 0xd3, 0xd3)),
            "gray" | "grey" => Some(Rgb(0x80, 0x80, 0x80)),
            "darkgray" | "darkgrey" => Some(Rgb(0x55, 0x55, 0x55)),
            _ => None,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    match hex.len() {
        // #f06 -> #ff0066
        3 => Some(Rgb(
            digit(0, 1)? * 17,
            digit(1, 1)? * 17,
            digit(2, 1)? * 17,
        )),
        6 => Some(Rgb(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_color("#4682b4"), Some(Rgb(0x46, 0x82, 0xb4)));
        assert_eq!(parse_color("#f06"), Some(Rgb(0xff, 0x00, 0x66)));
        assert_eq!(parse_color("#555"), Some(Rgb(0x55, 0x55, 0x55)));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }

    #[test]
    fn test_parse_named_and_array_colors() {
        assert_eq!(parse_color("SteelBlue"), Some(Rgb(0x46, 0x82, 0xb4)));
        assert_eq!(parse_color("[1.0, 0.0, 0.5]"), Some(Rgb(255, 0, 128)));
        assert_eq!(parse_color("[1.0, 0.0]"), None);
        assert_eq!(parse_color("mauve-ish"), None);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Rgb(0xff, 0x00, 0x66).to_hex(), "#ff0066");
    }
}
