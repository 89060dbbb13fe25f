use roster_core::db::open_db_in_memory;
use roster_core::{
    CountMode, Member, MemberRepository, MemberSearchCondition, MemberSearchRepository,
    PageRequest, SortField, SortOrder, SqliteMemberRepository, SqliteTeamRepository, Team,
    TeamRepository,
};
use rusqlite::Connection;

/// teamA: member1(10), member2(20); teamB: member3(30), member4(40).
fn seed_members_and_teams(conn: &Connection) {
    let teams = SqliteTeamRepository::try_new(conn).unwrap();
    let members = SqliteMemberRepository::try_new(conn).unwrap();

    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    teams.save(&mut team_a).unwrap();
    teams.save(&mut team_b).unwrap();

    for (name, age, team) in [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ] {
        members
            .save(&mut Member::with_team(name, age, team).unwrap())
            .unwrap();
    }
}

fn usernames<'a>(rows: impl IntoIterator<Item = &'a roster_core::MemberTeamDto>) -> Vec<&'a str> {
    rows.into_iter().map(|row| row.username.as_str()).collect()
}

#[test]
fn empty_condition_matches_everything() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let rows = repo.search(&MemberSearchCondition::default()).unwrap();
    assert_eq!(
        usernames(&rows),
        vec!["member1", "member2", "member3", "member4"]
    );

    let blank = MemberSearchCondition::default().username("  ").team_name("");
    assert_eq!(repo.search(&blank).unwrap(), rows);
}

#[test]
fn username_filter_is_exact() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let rows = repo
        .search(&MemberSearchCondition::default().username("member2"))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|row| row.username == "member2"));
    assert_eq!(rows[0].age, 20);
    assert_eq!(rows[0].team_name.as_deref(), Some("teamA"));

    let none = repo
        .search(&MemberSearchCondition::default().username("member"))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn age_range_and_team_name_filters_combine_with_and() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let condition = MemberSearchCondition::default()
        .age_goe(35)
        .age_loe(40)
        .team_name("teamB");
    let rows = repo.search(&condition).unwrap();
    assert_eq!(usernames(&rows), vec!["member4"]);

    let range = MemberSearchCondition::default().age_goe(20).age_loe(30);
    let rows = repo.search(&range).unwrap();
    assert_eq!(usernames(&rows), vec!["member2", "member3"]);
    assert!(rows.iter().all(|row| (20..=30).contains(&row.age)));

    let team_only = repo
        .search(&MemberSearchCondition::default().team_name("teamB"))
        .unwrap();
    assert_eq!(usernames(&team_only), vec!["member3", "member4"]);
}

#[test]
fn left_join_keeps_teamless_members_unless_team_is_filtered() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save(&mut Member::with_age("loner", 25)).unwrap();

    let rows = repo
        .search(&MemberSearchCondition::default().age_goe(25))
        .unwrap();
    assert_eq!(usernames(&rows), vec!["member3", "member4", "loner"]);
    let loner = rows.iter().find(|row| row.username == "loner").unwrap();
    assert_eq!(loner.team_id, None);
    assert_eq!(loner.team_name, None);

    let filtered = repo
        .search(&MemberSearchCondition::default().age_goe(25).team_name("teamB"))
        .unwrap();
    assert_eq!(usernames(&filtered), vec!["member3", "member4"]);
    assert_eq!(
        repo.count_matching(&MemberSearchCondition::default().team_name("teamB"))
            .unwrap(),
        2
    );
}

#[test]
fn paging_returns_requested_window_and_total() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let request = PageRequest::new(1, 2).unwrap();
    let condition = MemberSearchCondition::default();

    let simple = repo.search_page_simple(&condition, &request).unwrap();
    assert_eq!(usernames(&simple.content), vec!["member2", "member3"]);
    assert_eq!(simple.total, Some(4));

    let complex = repo.search_page_complex(&condition, &request).unwrap();
    assert_eq!(complex, simple);

    let skipped = repo
        .search_page(&condition, Some(&request), CountMode::Skip)
        .unwrap();
    assert_eq!(skipped.content, simple.content);
    assert_eq!(skipped.total, None);
}

#[test]
fn optimized_total_on_short_and_empty_pages() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    let condition = MemberSearchCondition::default();

    let short = repo
        .search_page_complex(&condition, &PageRequest::new(3, 10).unwrap())
        .unwrap();
    assert_eq!(usernames(&short.content), vec!["member4"]);
    assert_eq!(short.total, Some(4));

    let past_end = repo
        .search_page_complex(&condition, &PageRequest::new(10, 10).unwrap())
        .unwrap();
    assert!(past_end.is_empty());
    assert_eq!(past_end.total, Some(4));

    let unpaged = repo
        .search_page(&condition, None, CountMode::Optimized)
        .unwrap();
    assert_eq!(unpaged.len(), 4);
    assert_eq!(unpaged.total, Some(4));
    assert_eq!(unpaged.limit, None);
}

#[test]
fn sort_orders_apply_before_id_tie_break() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save(&mut Member::with_age("member5", 40)).unwrap();

    let by_age_desc = PageRequest::new(0, 10)
        .unwrap()
        .sorted_by(SortOrder::desc(SortField::Age));
    let rows = repo
        .search_page_complex(&MemberSearchCondition::default(), &by_age_desc)
        .unwrap();
    assert_eq!(
        usernames(&rows.content),
        vec!["member4", "member5", "member3", "member2", "member1"]
    );

    let nulls_first = PageRequest::new(0, 10)
        .unwrap()
        .sorted_by(SortOrder::desc(SortField::TeamName).nulls_first())
        .sorted_by(SortOrder::asc(SortField::Age));
    let rows = repo
        .search_page_complex(&MemberSearchCondition::default(), &nulls_first)
        .unwrap();
    assert_eq!(
        usernames(&rows.content),
        vec!["member5", "member3", "member4", "member1", "member2"]
    );

    let nulls_last = PageRequest::new(0, 10)
        .unwrap()
        .sorted_by(SortOrder::asc(SortField::TeamName).nulls_last());
    let rows = repo
        .search_page_complex(&MemberSearchCondition::default(), &nulls_last)
        .unwrap();
    assert_eq!(rows.content.last().unwrap().username, "member5");
}

#[test]
fn repeated_search_is_identical() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let condition = MemberSearchCondition::default().age_goe(15);
    let request = PageRequest::new(0, 2)
        .unwrap()
        .sorted_by(SortOrder::asc(SortField::TeamName));
    let first = repo.search_page_complex(&condition, &request).unwrap();
    let second = repo.search_page_complex(&condition, &request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn page_serializes_with_content_and_total() {
    let conn = open_db_in_memory().unwrap();
    seed_members_and_teams(&conn);
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let page = repo
        .search_page_complex(
            &MemberSearchCondition::default().username("member1"),
            &PageRequest::new(0, 5).unwrap(),
        )
        .unwrap();
    let json = serde_json::to_value(&page).unwrap();

    assert_eq!(json["total"], 1);
    assert_eq!(json["limit"], 5);
    assert_eq!(json["content"][0]["username"], "member1");
    assert_eq!(json["content"][0]["team_name"], "teamA");
}
