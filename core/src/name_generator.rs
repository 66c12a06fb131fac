//! Deterministic Indian person-name generation from curated lists.
//!
//! Same RosterRng seed, same names.

use crate::rng::RosterRng;

pub struct NameGenerator;

impl NameGenerator {
    /// "First Last", gender drawn 50/50.
    pub fn generate_full_name(rng: &mut RosterRng) -> String {
        let first = Self::generate_first_name(rng);
        let last = Self::generate_last_name(rng);
        format!("{first} {last}")
    }

    pub fn generate_first_name(rng: &mut RosterRng) -> &'static str {
        if rng.chance(0.5) {
            *rng.pick(MALE_FIRST_NAMES)
        } else {
            *rng.pick(FEMALE_FIRST_NAMES)
        }
    }

    pub fn generate_last_name(rng: &mut RosterRng) -> &'static str {
        *rng.pick(LAST_NAMES)
    }

    /// "Ravi Kumar" -> "ravi.kumar@email.com"
    pub fn email_for(full_name: &str) -> String {
        format!("{}@email.com", full_name.to_lowercase().replace(' ', "."))
    }
}

const MALE_FIRST_NAMES: &[&str] = &[
    "Rajesh", "Amit", "Sunil", "Vikram", "Sanjay", "Manoj", "Arun", "Karthik",
    "Deepak", "Ravi", "Prakash", "Sandeep", "Vinod", "Rahul", "Ajay",
    "Ashok", "Nitin", "Pradeep", "Mukesh", "Ramesh", "Suresh", "Vivek",
    "Anand", "Ganesh", "Harish",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Priya", "Anjali", "Sunita", "Kavita", "Neha", "Pooja", "Rekha",
    "Meena", "Lakshmi", "Divya", "Sneha", "Swati", "Nisha", "Rani",
    "Geeta", "Anita", "Shobha", "Padma", "Jyoti", "Sarita",
    "Asha", "Usha", "Kamala", "Radha", "Shalini",
];

const LAST_NAMES: &[&str] = &[
    "Sharma", "Verma", "Singh", "Patel", "Gupta", "Kumar", "Reddy",
    "Nair", "Iyer", "Mukherjee", "Chatterjee", "Das", "Mishra",
    "Joshi", "Rao", "Pillai", "Menon", "Deshmukh", "Patil", "Kulkarni",
    "Banerjee", "Ghosh", "Bose", "Mehta", "Shah", "Thakur", "Yadav",
    "Pandey", "Dubey", "Tiwari",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        let mut a = RosterRng::new(99);
        let mut b = RosterRng::new(99);
        for _ in 0..50 {
            assert_eq!(
                NameGenerator::generate_full_name(&mut a),
                NameGenerator::generate_full_name(&mut b)
            );
        }
    }

    #[test]
    fn full_name_has_first_and_last() {
        let mut rng = RosterRng::new(3);
        let name = NameGenerator::generate_full_name(&mut rng);
        let parts: Vec<&str> = name.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert!(LAST_NAMES.contains(&parts[1]));
    }

    #[test]
    fn email_is_dotted_lowercase() {
        assert_eq!(NameGenerator::email_for("Ravi Kumar"), "ravi.kumar@email.com");
    }
}
