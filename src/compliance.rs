use chrono::{Datelike, NaiveDate};

use crate::models::{ComplianceAlert, ComplianceStatus, Iep, Obligation, Student};

// IEP teams flag reviews a month out; the window is policy, not derived.
pub const DEFAULT_FLAG_WINDOW_DAYS: i64 = 30;

const TRANSITION_PLAN_AGE: i32 = 16;

pub fn check_compliance(iep: &Iep, student: &Student, today: NaiveDate) -> Vec<ComplianceAlert> {
    check_compliance_with_window(iep, student, today, DEFAULT_FLAG_WINDOW_DAYS)
}

// Pure function of its arguments: no clock reads, no hidden state.
pub fn check_compliance_with_window(
    iep: &Iep,
    student: &Student,
    today: NaiveDate,
    window_days: i64,
) -> Vec<ComplianceAlert> {
    let mut alerts = vec![
        ComplianceAlert {
            obligation: Obligation::AnnualReview,
            due_date: iep.annual_review_date,
            status: classify(iep.annual_review_date, today, window_days),
        },
        ComplianceAlert {
            obligation: Obligation::TriennialEvaluation,
            due_date: iep.triennial_evaluation_date,
            status: classify(iep.triennial_evaluation_date, today, window_days),
        },
    ];

    // The transfer-of-rights notice must reach the student the year before
    // majority, so it comes due on the 17th birthday.
    if let Some(plan) = &iep.transition_plan {
        if student.age_on(today) >= TRANSITION_PLAN_AGE && !plan.transfer_of_rights_notice {
            let due_date = birthday(student.date_of_birth, 17);
            alerts.push(ComplianceAlert {
                obligation: Obligation::TransferOfRightsNotice,
                due_date,
                status: classify(due_date, today, window_days),
            });
        }
    }

    alerts
}

pub fn classify(due_date: NaiveDate, today: NaiveDate, window_days: i64) -> ComplianceStatus {
    let days_until = (due_date - today).num_days();
    if days_until < 0 {
        ComplianceStatus::Overdue
    } else if days_until <= window_days {
        ComplianceStatus::Due
    } else {
        ComplianceStatus::Upcoming
    }
}

// Feb 29 birthdays roll to Mar 1 in non-leap years.
fn birthday(date_of_birth: NaiveDate, years: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(
        date_of_birth.year() + years,
        date_of_birth.month(),
        date_of_birth.day(),
    )
    .unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(date_of_birth.year() + years, 3, 1)
            .unwrap_or(date_of_birth)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisabilityCategory, IepStatus, TransitionPlan};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn sample_student(date_of_birth: NaiveDate) -> Student {
        Student {
            id: Uuid::new_v4(),
            first_name: "Marcus".to_string(),
            last_name: "Williams".to_string(),
            grade_level: "10".to_string(),
            date_of_birth,
            disability: DisabilityCategory::Autism,
            organization: "Lincoln USD".to_string(),
        }
    }

    fn sample_iep(student: &Student, annual_review: NaiveDate) -> Iep {
        Iep {
            id: Uuid::new_v4(),
            student_id: student.id,
            plan_year: "2025-2026".to_string(),
            effective_date: annual_review - Duration::days(365),
            annual_review_date: annual_review,
            triennial_evaluation_date: annual_review + Duration::days(365),
            disability: student.disability,
            present_levels: String::new(),
            transition_plan: None,
            status: IepStatus::Active,
            amendments: Vec::new(),
        }
    }

    #[test]
    fn window_boundaries_are_exact() {
        let due = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert_eq!(
            classify(due, due - Duration::days(31), 30),
            ComplianceStatus::Upcoming
        );
        assert_eq!(
            classify(due, due - Duration::days(30), 30),
            ComplianceStatus::Due
        );
        assert_eq!(classify(due, due, 30), ComplianceStatus::Due);
        assert_eq!(
            classify(due, due + Duration::days(1), 30),
            ComplianceStatus::Overdue
        );
    }

    #[test]
    fn annual_and_triennial_dates_are_always_checked() {
        let student = sample_student(NaiveDate::from_ymd_opt(2017, 3, 12).unwrap());
        let review = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let iep = sample_iep(&student, review);
        let today = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

        let alerts = check_compliance(&iep, &student, today);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].obligation, Obligation::AnnualReview);
        assert_eq!(alerts[0].status, ComplianceStatus::Due);
        assert_eq!(alerts[1].obligation, Obligation::TriennialEvaluation);
        assert_eq!(alerts[1].status, ComplianceStatus::Upcoming);
    }

    #[test]
    fn missing_transfer_notice_flags_for_sixteen_year_old() {
        let student = sample_student(NaiveDate::from_ymd_opt(2009, 6, 15).unwrap());
        let review = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let mut iep = sample_iep(&student, review);
        iep.transition_plan = Some(TransitionPlan {
            postsecondary_goals: "Community college, part-time retail work".to_string(),
            transfer_of_rights_notice: false,
        });

        let today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let alerts = check_compliance(&iep, &student, today);
        let notice = alerts
            .iter()
            .find(|alert| alert.obligation == Obligation::TransferOfRightsNotice)
            .expect("notice alert");
        assert_eq!(
            notice.due_date,
            NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
        );
        assert_eq!(notice.status, ComplianceStatus::Overdue);
    }

    #[test]
    fn delivered_transfer_notice_raises_no_alert() {
        let student = sample_student(NaiveDate::from_ymd_opt(2009, 6, 15).unwrap());
        let review = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let mut iep = sample_iep(&student, review);
        iep.transition_plan = Some(TransitionPlan {
            postsecondary_goals: "Community college".to_string(),
            transfer_of_rights_notice: true,
        });

        let today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let alerts = check_compliance(&iep, &student, today);
        assert!(alerts
            .iter()
            .all(|alert| alert.obligation != Obligation::TransferOfRightsNotice));
    }

    #[test]
    fn transition_plan_is_ignored_below_sixteen() {
        let student = sample_student(NaiveDate::from_ymd_opt(2012, 6, 15).unwrap());
        let review = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let mut iep = sample_iep(&student, review);
        iep.transition_plan = Some(TransitionPlan {
            postsecondary_goals: "Undecided".to_string(),
            transfer_of_rights_notice: false,
        });

        let today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let alerts = check_compliance(&iep, &student, today);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn custom_window_widens_the_due_band() {
        let due = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert_eq!(
            classify(due, due - Duration::days(45), 60),
            ComplianceStatus::Due
        );
    }
}
