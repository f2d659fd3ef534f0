//! Label phrasings for canonical patient-data keypaths.
//!
//! Patterns are stored already normalized (lowercase, alphanumerics and
//! single spaces). Order matters: on equal-length hits the earlier entry
//! wins, so the catch-all `date` family sits last.

pub struct SynonymEntry {
    pub keypath: &'static str,
    pub patterns: &'static [&'static str],
}

pub const SYNONYMS: &[SynonymEntry] = &[
    SynonymEntry {
        keypath: "patient.fullName",
        patterns: &[
            "name",
            "full name",
            "patient name",
            "patients name",
            "name of patient",
            "patient full name",
            "legal name",
            "print name",
        ],
    },
    SynonymEntry {
        keypath: "patient.firstName",
        patterns: &["first name", "firstname", "fname", "forename"],
    },
    SynonymEntry {
        keypath: "patient.lastName",
        patterns: &["last name", "lastname", "surname", "family name", "lname"],
    },
    SynonymEntry {
        keypath: "patient.middleName",
        patterns: &["middle name", "middle initial"],
    },
    SynonymEntry {
        keypath: "_computed.dobFormatted",
        patterns: &[
            "dob",
            "date of birth",
            "birth date",
            "birthdate",
            "birthday",
            "patient dob",
        ],
    },
    SynonymEntry {
        keypath: "_computed.patientAge",
        patterns: &["age", "patient age", "current age"],
    },
    SynonymEntry {
        keypath: "patient.sex",
        patterns: &["sex", "gender", "patient sex", "sex at birth"],
    },
    SynonymEntry {
        keypath: "patient.maritalStatus",
        patterns: &["marital status", "marital"],
    },
    SynonymEntry {
        keypath: "patient.emergencyContact.phone",
        patterns: &["emergency phone", "emergency contact phone"],
    },
    SynonymEntry {
        keypath: "patient.emergencyContact.name",
        patterns: &["emergency contact", "emergency contact name", "in case of emergency"],
    },
    SynonymEntry {
        keypath: "patient.phone",
        patterns: &[
            "phone",
            "phone number",
            "telephone",
            "telephone number",
            "tel",
            "home phone",
            "cell phone",
            "cell",
            "mobile",
            "mobile phone",
            "contact number",
        ],
    },
    SynonymEntry {
        keypath: "patient.email",
        patterns: &["email", "email address", "e mail"],
    },
    SynonymEntry {
        keypath: "patient.fullAddress",
        patterns: &[
            "address",
            "home address",
            "street address",
            "mailing address",
            "residential address",
        ],
    },
    SynonymEntry {
        keypath: "patient.address.line1",
        patterns: &["address line 1", "address 1", "street"],
    },
    SynonymEntry {
        keypath: "patient.address.city",
        patterns: &["city", "town"],
    },
    SynonymEntry {
        keypath: "patient.address.state",
        patterns: &["state", "province"],
    },
    SynonymEntry {
        keypath: "patient.address.postalCode",
        patterns: &["zip", "zip code", "zipcode", "postal code", "postcode"],
    },
    SynonymEntry {
        keypath: "patient.ssn",
        patterns: &["ssn", "social security number", "social security"],
    },
    SynonymEntry {
        keypath: "insurance.provider",
        patterns: &[
            "insurance",
            "insurance company",
            "insurance provider",
            "insurance carrier",
            "insurer",
            "carrier",
        ],
    },
    SynonymEntry {
        keypath: "insurance.policyNumber",
        patterns: &[
            "policy number",
            "policy no",
            "policy",
            "member id",
            "subscriber id",
            "insurance id",
        ],
    },
    SynonymEntry {
        keypath: "insurance.groupNumber",
        patterns: &["group number", "group no", "group"],
    },
    SynonymEntry {
        keypath: "patient.primaryCarePhysician",
        patterns: &["primary care physician", "pcp", "family doctor", "physician"],
    },
    SynonymEntry {
        keypath: "patient.employer",
        patterns: &["employer", "employer name", "place of employment"],
    },
    SynonymEntry {
        keypath: "_computed.todayDate",
        patterns: &["date", "todays date", "today", "date signed", "current date"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::matching::text::normalize;

    #[test]
    fn patterns_are_stored_normalized() {
        for entry in SYNONYMS {
            for pattern in entry.patterns {
                assert_eq!(normalize(pattern), *pattern, "{}", entry.keypath);
            }
        }
    }

    #[test]
    fn given_name_is_not_a_synonym() {
        assert!(SYNONYMS
            .iter()
            .flat_map(|e| e.patterns.iter())
            .all(|p| !p.contains("given")));
    }

    #[test]
    fn date_family_is_last() {
        assert_eq!(SYNONYMS.last().map(|e| e.keypath), Some("_computed.todayDate"));
    }
}
