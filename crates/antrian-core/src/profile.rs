//! Synthetic contact details for registrations that omit them.
//!
//! Kiosk registrations usually carry only a name, a specialty, and a
//! complaint. The store fills the blank email, date of birth, and address
//! with plausible values so downstream displays and exports always have
//! complete records.

use antrian_types::NewPatient;
use chrono::{Datelike, Utc};
use rand::Rng;

/// Addresses drawn from when a registration has none.
const ADDRESSES: &[&str] = &[
    "Jl. Sudirman No. 45, Karet Tengsin, Tanah Abang, Jakarta Pusat, DKI Jakarta 10220",
    "Jl. Gatot Subroto Kav. 32-34, Kuningan Barat, Mampang Prapatan, Jakarta Selatan, DKI Jakarta 12710",
    "Jl. Thamrin No. 59, Gondangdia, Menteng, Jakarta Pusat, DKI Jakarta 10350",
    "Jl. Ahmad Yani No. 28, Kauman, Klojen, Kota Malang, Jawa Timur 65119",
    "Jl. Diponegoro No. 156, Citarum, Bandung Wetan, Kota Bandung, Jawa Barat 40115",
    "Jl. Veteran No. 12, Ketawanggede, Lowokwaru, Kota Malang, Jawa Timur 65145",
    "Jl. Gajah Mada No. 89, Peterongan, Semarang Tengah, Kota Semarang, Jawa Tengah 50134",
    "Jl. Imam Bonjol No. 207, Pendrikan Kidul, Semarang Tengah, Kota Semarang, Jawa Tengah 50131",
    "Jl. Pemuda No. 142, Sekayu, Semarang Tengah, Kota Semarang, Jawa Tengah 50132",
    "Jl. Pahlawan No. 76, Sawahan, Kota Surabaya, Jawa Timur 60251",
    "Jl. Basuki Rahmat No. 98-104, Embong Kaliasin, Genteng, Kota Surabaya, Jawa Timur 60271",
    "Jl. Raya Darmo No. 135, Wonokromo, Kota Surabaya, Jawa Timur 60241",
    "Jl. Malioboro No. 60, Sosromenduran, Gedong Tengen, Kota Yogyakarta, DI Yogyakarta 55271",
    "Jl. Solo No. 19, Kotabaru, Gondokusuman, Kota Yogyakarta, DI Yogyakarta 55224",
    "Jl. Kaliurang KM 5, Caturtunggal, Depok, Sleman, DI Yogyakarta 55281",
    "Jl. Teuku Umar No. 23, Denpasar Barat, Kota Denpasar, Bali 80114",
    "Jl. Hayam Wuruk No. 188, Dauh Puri Klod, Denpasar Barat, Kota Denpasar, Bali 80114",
    "Jl. Sunset Road No. 86, Kuta, Badung, Bali 80361",
    "Jl. Ahmad Dahlan No. 66, Panjang Utara, Pekalongan Utara, Kota Pekalongan, Jawa Tengah 51141",
    "Jl. Jenderal Sudirman No. 333, Purwanegara, Purwokerto Utara, Banyumas, Jawa Tengah 53116",
];

const EMAIL_DOMAINS: &[&str] = &["gmail.com", "yahoo.com"];

/// Local part used when the name has no usable characters.
const FALLBACK_LOCAL_PART: &str = "pasien";

/// Longest name prefix kept in a generated email.
const MAX_LOCAL_PART_CHARS: usize = 10;

/// Fill every blank contact field of a registration.
pub fn fill_missing<R: Rng>(input: &mut NewPatient, rng: &mut R) {
    if input.email.trim().is_empty() {
        input.email = generate_email(&input.full_name, rng);
    }
    if input.date_of_birth.trim().is_empty() {
        input.date_of_birth = generate_date_of_birth(rng);
    }
    if input.address.trim().is_empty() {
        input.address = generate_address(rng);
    }
}

/// Build an email from the first characters of the name plus a random
/// number, e.g. `sitirahma417@gmail.com`.
pub fn generate_email<R: Rng>(full_name: &str, rng: &mut R) -> String {
    let mut local: String = full_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_LOCAL_PART_CHARS)
        .collect::<String>()
        .to_ascii_lowercase();
    if local.is_empty() {
        local = FALLBACK_LOCAL_PART.to_owned();
    }
    let number: u32 = rng.random_range(0..999);
    let domain = pick(EMAIL_DOMAINS, rng);
    format!("{local}{number}@{domain}")
}

/// A `YYYY-MM-DD` birth date for someone aged 18 to 70 this year.
pub fn generate_date_of_birth<R: Rng>(rng: &mut R) -> String {
    let years_ago: i32 = rng.random_range(18..=70);
    let month: u32 = rng.random_range(1..=12);
    // Day 28 exists in every month.
    let day: u32 = rng.random_range(1..=28);
    let year = Utc::now().year().saturating_sub(years_ago);
    format!("{year:04}-{month:02}-{day:02}")
}

/// One of the built-in addresses.
pub fn generate_address<R: Rng>(rng: &mut R) -> String {
    pick(ADDRESSES, rng).to_owned()
}

fn pick<'a, R: Rng>(pool: &[&'a str], rng: &mut R) -> &'a str {
    let idx = rng.random_range(0..pool.len());
    pool.get(idx).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn email_uses_sanitized_name_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let email = generate_email("Siti Rahmawati Putri", &mut rng);
        assert!(email.starts_with("sitirahmaw"), "got {email}");
        assert!(email.ends_with("@gmail.com") || email.ends_with("@yahoo.com"));
    }

    #[test]
    fn email_falls_back_for_empty_name() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generate_email("  ", &mut rng).starts_with(FALLBACK_LOCAL_PART));
    }

    #[test]
    fn date_of_birth_is_a_valid_adult_date() {
        let mut rng = StdRng::seed_from_u64(11);
        let this_year = Utc::now().year();
        for _ in 0..200 {
            let dob = generate_date_of_birth(&mut rng);
            let parsed = NaiveDate::parse_from_str(&dob, "%Y-%m-%d");
            assert!(parsed.is_ok(), "unparseable {dob}");
            let age = this_year - parsed.map(|d| d.year()).unwrap_or_default();
            assert!((18..=70).contains(&age), "age {age} from {dob}");
        }
    }

    #[test]
    fn fill_missing_keeps_supplied_fields() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut input = NewPatient {
            full_name: String::from("Budi"),
            email: String::from("budi@rs.id"),
            specialist: String::from("Poli Gigi"),
            ..NewPatient::default()
        };
        fill_missing(&mut input, &mut rng);

        assert_eq!(input.email, "budi@rs.id");
        assert!(!input.date_of_birth.is_empty());
        assert!(ADDRESSES.contains(&input.address.as_str()));
    }
}
