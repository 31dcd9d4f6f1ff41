use chrono::NaiveDate;

use super::appointment::AppointmentRecord;
use super::enums::AppointmentStatus;
use super::pet::Pet;
use super::user::User;

/// List-screen filter. Empty fields match everything.
#[derive(Debug, Default)]
pub struct AppointmentFilter {
    /// Case-insensitive match against pet, owner and veterinarian names
    /// or the appointment id.
    pub search: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

/// Lookup tables used to turn record references into searchable names.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameDirectory<'a> {
    pub owners: &'a [User],
    pub veterinarians: &'a [User],
    pub pets: &'a [Pet],
}

impl NameDirectory<'_> {
    fn owner_name(&self, id: &str) -> String {
        find_user(self.owners, id).map(User::full_name).unwrap_or_default()
    }

    fn veterinarian_name(&self, id: &str) -> String {
        find_user(self.veterinarians, id)
            .map(User::full_name)
            .unwrap_or_default()
    }

    fn pet_name(&self, id: &str) -> &str {
        self.pets
            .iter()
            .find(|p| p.pet_id == id)
            .map(|p| p.name.as_str())
            .unwrap_or_default()
    }
}

fn find_user<'u>(users: &'u [User], id: &str) -> Option<&'u User> {
    users.iter().find(|u| u.document_number == id)
}

impl AppointmentFilter {
    pub fn matches(&self, record: &AppointmentRecord, names: &NameDirectory<'_>) -> bool {
        let appointment = &record.data;

        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }

        if let Some(date) = self.date {
            if appointment.date_time.date() != date {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                let candidates = [
                    names.pet_name(&appointment.pet_id).to_lowercase(),
                    names.owner_name(&appointment.owner_id).to_lowercase(),
                    names.veterinarian_name(&appointment.veterinarian_id).to_lowercase(),
                    record.id().unwrap_or_default().to_lowercase(),
                ];
                candidates.iter().any(|c| c.contains(&term))
            }
        }
    }

    pub fn apply<'r>(
        &self,
        records: &'r [AppointmentRecord],
        names: &NameDirectory<'_>,
    ) -> Vec<&'r AppointmentRecord> {
        records.iter().filter(|r| self.matches(r, names)).collect()
    }
}
