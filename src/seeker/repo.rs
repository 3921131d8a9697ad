use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::auth::authz::Owned;

/// Stored with capitalized labels, and presented the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "proficiency_level")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

pub struct ProfileFields<'a> {
    pub phone: Option<&'a str>,
    pub location: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub years_of_experience: Option<i32>,
}

const PROFILE_COLUMNS: &str =
    "id, user_id, phone, location, bio, years_of_experience, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SeekerProfile {
    pub id: i32,
    pub user_id: i32,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub years_of_experience: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Owned for SeekerProfile {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

impl SeekerProfile {
    pub async fn find_by_user(
        db: &PgPool,
        user_id: i32,
    ) -> Result<Option<SeekerProfile>, sqlx::Error> {
        sqlx::query_as::<_, SeekerProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM job_seeker_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        user_id: i32,
        fields: &ProfileFields<'_>,
    ) -> Result<SeekerProfile, sqlx::Error> {
        sqlx::query_as::<_, SeekerProfile>(&format!(
            "INSERT INTO job_seeker_profiles (user_id, phone, location, bio, years_of_experience) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 0)) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(fields.phone)
        .bind(fields.location)
        .bind(fields.bio)
        .bind(fields.years_of_experience)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: i32,
        fields: &ProfileFields<'_>,
    ) -> Result<SeekerProfile, sqlx::Error> {
        sqlx::query_as::<_, SeekerProfile>(&format!(
            "UPDATE job_seeker_profiles SET \
                phone = COALESCE($2, phone), \
                location = COALESCE($3, location), \
                bio = COALESCE($4, bio), \
                years_of_experience = COALESCE($5, years_of_experience), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(fields.phone)
        .bind(fields.location)
        .bind(fields.bio)
        .bind(fields.years_of_experience)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM job_seeker_profiles WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i32,
    pub profile_id: i32,
    pub skill_name: String,
    pub proficiency_level: Option<ProficiencyLevel>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Skill {
    pub async fn list_for_profile(db: &PgPool, profile_id: i32) -> Result<Vec<Skill>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            "SELECT id, profile_id, skill_name, proficiency_level, created_at \
             FROM skills WHERE profile_id = $1 ORDER BY id",
        )
        .bind(profile_id)
        .fetch_all(db)
        .await
    }

    pub async fn exists_on_profile(
        db: &PgPool,
        profile_id: i32,
        skill_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM skills WHERE profile_id = $1 AND skill_name = $2)",
        )
        .bind(profile_id)
        .bind(skill_name)
        .fetch_one(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        profile_id: i32,
        skill_name: &str,
        proficiency_level: Option<ProficiencyLevel>,
    ) -> Result<Skill, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            "INSERT INTO skills (profile_id, skill_name, proficiency_level) VALUES ($1, $2, $3) \
             RETURNING id, profile_id, skill_name, proficiency_level, created_at",
        )
        .bind(profile_id)
        .bind(skill_name)
        .bind(proficiency_level)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: i32,
        skill_name: Option<&str>,
        proficiency_level: Option<ProficiencyLevel>,
    ) -> Result<Skill, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            "UPDATE skills SET \
                skill_name = COALESCE($2, skill_name), \
                proficiency_level = COALESCE($3::proficiency_level, proficiency_level) \
             WHERE id = $1 \
             RETURNING id, profile_id, skill_name, proficiency_level, created_at",
        )
        .bind(id)
        .bind(skill_name)
        .bind(proficiency_level)
        .fetch_one(db)
        .await
    }

    /// Scoped to the profile so only the owner's rows can be removed.
    pub async fn remove_scoped(db: &PgPool, id: i32, profile_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1 AND profile_id = $2")
            .bind(id)
            .bind(profile_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Skill joined with the user who owns the enclosing profile, so mutations
/// can be authorized in one load.
#[derive(Debug, Clone, FromRow)]
pub struct SkillWithOwner {
    pub id: i32,
    pub profile_id: i32,
    pub skill_name: String,
    pub proficiency_level: Option<ProficiencyLevel>,
    pub owner_user_id: i32,
}

impl Owned for SkillWithOwner {
    fn owner_id(&self) -> i32 {
        self.owner_user_id
    }
}

impl SkillWithOwner {
    pub async fn find(db: &PgPool, skill_id: i32) -> Result<Option<SkillWithOwner>, sqlx::Error> {
        sqlx::query_as::<_, SkillWithOwner>(
            "SELECT s.id, s.profile_id, s.skill_name, s.proficiency_level, \
                    p.user_id AS owner_user_id \
             FROM skills s \
             JOIN job_seeker_profiles p ON p.id = s.profile_id \
             WHERE s.id = $1",
        )
        .bind(skill_id)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proficiency_serializes_with_capitalized_labels() {
        assert_eq!(
            serde_json::to_string(&ProficiencyLevel::Intermediate).expect("json"),
            "\"Intermediate\""
        );
        let parsed: ProficiencyLevel = serde_json::from_str("\"Expert\"").expect("parse");
        assert_eq!(parsed, ProficiencyLevel::Expert);
    }

    #[test]
    fn skill_ownership_resolves_through_the_profile() {
        let skill = SkillWithOwner {
            id: 1,
            profile_id: 4,
            skill_name: "Rust".into(),
            proficiency_level: Some(ProficiencyLevel::Advanced),
            owner_user_id: 21,
        };
        assert_eq!(skill.owner_id(), 21);
    }
}
