use derive_more::{Display, Into};

/// CNPJ stored as its 14 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Into)]
#[display(fmt = "{}", _0)]
pub struct Cnpj(String);

/// CPF stored as its 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Into)]
#[display(fmt = "{}", _0)]
pub struct Cpf(String);

fn digits_of(raw: &str) -> Vec<u32> {
    raw.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Input may only contain digits and the usual `.` `/` `-` separators.
fn only_document_chars(raw: &str) -> bool {
    raw.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '-' | ' '))
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn to_string(digits: &[u32]) -> String {
    digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let weights = &WEIGHTS[WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let first_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (first_weight - i as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

impl Cnpj {
    pub fn parse(raw: &str) -> Option<Self> {
        if !only_document_chars(raw) {
            return None;
        }
        let digits = digits_of(raw);
        if digits.len() != 14 || all_same(&digits) {
            return None;
        }
        let first = cnpj_check_digit(&digits[..12]);
        let second = cnpj_check_digit(&digits[..13]);
        if digits[12] != first || digits[13] != second {
            return None;
        }
        Some(Self(to_string(&digits)))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `11.222.333/0001-81`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &d[..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..]
        )
    }
}

impl Cpf {
    pub fn parse(raw: &str) -> Option<Self> {
        if !only_document_chars(raw) {
            return None;
        }
        let digits = digits_of(raw);
        if digits.len() != 11 || all_same(&digits) {
            return None;
        }
        let first = cpf_check_digit(&digits[..9]);
        let second = cpf_check_digit(&digits[..10]);
        if digits[9] != first || digits[10] != second {
            return None;
        }
        Some(Self(to_string(&digits)))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `529.982.247-25`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_cnpj_with_or_without_mask() {
        let masked = Cnpj::parse("11.222.333/0001-81").unwrap();
        let bare = Cnpj::parse("11222333000181").unwrap();
        assert_eq!(masked, bare);
        assert_eq!(bare.digits(), "11222333000181");
        assert_eq!(bare.formatted(), "11.222.333/0001-81");
        assert!(Cnpj::parse("00.000.000/0001-91").is_some());
    }

    #[test]
    fn rejects_bad_cnpj() {
        assert!(Cnpj::parse("11.222.333/0001-82").is_none());
        assert!(Cnpj::parse("11111111111111").is_none());
        assert!(Cnpj::parse("1122233300018").is_none());
        assert!(Cnpj::parse("11a22233300018").is_none());
    }

    #[test]
    fn accepts_valid_cpf() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(cpf.digits(), "52998224725");
        assert_eq!(cpf.formatted(), "529.982.247-25");
        assert_eq!(cpf.to_string(), "52998224725");
    }

    #[test]
    fn rejects_bad_cpf() {
        assert!(Cpf::parse("529.982.247-26").is_none());
        assert!(Cpf::parse("000.000.000-00").is_none());
        assert!(Cpf::parse("5299822472").is_none());
    }
}
