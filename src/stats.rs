use crate::models::Statistics;

/// Age buckets the backend reports, in display order.
pub const AGE_BUCKETS: [&str; 4] = ["18-25", "26-35", "36-45", "46+"];

#[derive(Debug, Clone, PartialEq)]
pub struct SharePoint {
    pub label: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRow {
    pub date: String,
    pub channel: String,
    pub success_count: u64,
    pub fail_count: u64,
    pub success_rate: f64,
}

/// Display-ready figures derived from one statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsView {
    pub total_clients: u64,
    pub genders: Vec<SharePoint>,
    pub ages: Vec<SharePoint>,
    pub campaigns: Vec<CampaignRow>,
    pub total_success: u64,
    pub total_fail: u64,
}

pub fn build_view(stats: &Statistics) -> StatisticsView {
    let genders = shares(&[
        ("male".to_string(), stats.gender_data.male),
        ("female".to_string(), stats.gender_data.female),
    ]);

    let mut ages: Vec<(String, u64)> = AGE_BUCKETS
        .iter()
        .map(|bucket| (bucket.to_string(), stats.age_data.get(*bucket).copied().unwrap_or(0)))
        .collect();
    ages.extend(
        stats
            .age_data
            .iter()
            .filter(|(bucket, _)| !AGE_BUCKETS.contains(&bucket.as_str()))
            .map(|(bucket, count)| (bucket.clone(), *count)),
    );
    let ages = shares(&ages);

    let mut campaigns: Vec<CampaignRow> = stats
        .campaign_data
        .iter()
        .map(|point| CampaignRow {
            date: point.date.get(..10).unwrap_or(&point.date).to_string(),
            channel: point.channel.clone(),
            success_count: point.success_count,
            fail_count: point.fail_count,
            success_rate: ratio(point.success_count, point.success_count + point.fail_count),
        })
        .collect();
    campaigns.sort_by(|a, b| a.date.cmp(&b.date));

    let total_success = campaigns.iter().map(|row| row.success_count).sum();
    let total_fail = campaigns.iter().map(|row| row.fail_count).sum();

    StatisticsView {
        total_clients: stats.total_clients,
        genders,
        ages,
        campaigns,
        total_success,
        total_fail,
    }
}

fn shares(counts: &[(String, u64)]) -> Vec<SharePoint> {
    let total: u64 = counts.iter().map(|(_, count)| count).sum();
    counts
        .iter()
        .map(|(label, count)| SharePoint {
            label: label.clone(),
            count: *count,
            percent: ratio(*count, total) * 100.0,
        })
        .collect()
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
