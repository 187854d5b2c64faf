//! Algerian wilayas (administrative regions) used for addresses and delivery pricing.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Wilaya {
    pub code: u8,
    pub name: &'static str,
}

const fn w(code: u8, name: &'static str) -> Wilaya {
    Wilaya { code, name }
}

static WILAYAS: [Wilaya; 58] = [
    w(1, "Adrar"),
    w(2, "Chlef"),
    w(3, "Laghouat"),
    w(4, "Oum El Bouaghi"),
    w(5, "Batna"),
    w(6, "Béjaïa"),
    w(7, "Biskra"),
    w(8, "Béchar"),
    w(9, "Blida"),
    w(10, "Bouira"),
    w(11, "Tamanrasset"),
    w(12, "Tébessa"),
    w(13, "Tlemcen"),
    w(14, "Tiaret"),
    w(15, "Tizi Ouzou"),
    w(16, "Alger"),
    w(17, "Djelfa"),
    w(18, "Jijel"),
    w(19, "Sétif"),
    w(20, "Saïda"),
    w(21, "Skikda"),
    w(22, "Sidi Bel Abbès"),
    w(23, "Annaba"),
    w(24, "Guelma"),
    w(25, "Constantine"),
    w(26, "Médéa"),
    w(27, "Mostaganem"),
    w(28, "M'Sila"),
    w(29, "Mascara"),
    w(30, "Ouargla"),
    w(31, "Oran"),
    w(32, "El Bayadh"),
    w(33, "Illizi"),
    w(34, "Bordj Bou Arréridj"),
    w(35, "Boumerdès"),
    w(36, "El Tarf"),
    w(37, "Tindouf"),
    w(38, "Tissemsilt"),
    w(39, "El Oued"),
    w(40, "Khenchela"),
    w(41, "Souk Ahras"),
    w(42, "Tipaza"),
    w(43, "Mila"),
    w(44, "Aïn Defla"),
    w(45, "Naâma"),
    w(46, "Aïn Témouchent"),
    w(47, "Ghardaïa"),
    w(48, "Relizane"),
    w(49, "Timimoun"),
    w(50, "Bordj Badji Mokhtar"),
    w(51, "Ouled Djellal"),
    w(52, "Béni Abbès"),
    w(53, "In Salah"),
    w(54, "In Guezzam"),
    w(55, "Touggourt"),
    w(56, "Djanet"),
    w(57, "El M'Ghair"),
    w(58, "El Meniaa"),
];

/// All wilayas in code order.
pub fn all() -> &'static [Wilaya] {
    &WILAYAS
}

/// Resolves a wilaya by name (case-insensitive) or by its numeric code ("16", "09").
pub fn find(input: &str) -> Option<&'static Wilaya> {
    let needle = input.trim();
    if needle.is_empty() {
        return None;
    }

    if let Ok(code) = needle.parse::<u8>() {
        return WILAYAS.iter().find(|w| w.code == code);
    }

    WILAYAS
        .iter()
        .find(|w| w.name == needle)
        .or_else(|| {
            let lowered = needle.to_lowercase();
            WILAYAS.iter().find(|w| w.name.to_lowercase() == lowered)
        })
}

pub fn is_valid(input: &str) -> bool {
    find(input).is_some()
}
