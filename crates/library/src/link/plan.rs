use crate::albums::AlbumRecord;
use crate::{MergePolicy, User};
use albumlink_cache::SHARED_SPACE;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// `users/<index>` pointing at a user's photo root, or `users/shared`
/// pointing at the shared space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLink {
    pub user: u32,
    pub link: PathBuf,
    pub target: PathBuf,
}

/// A single album item link, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub link: PathBuf,
    pub target: PathBuf,
    pub user: u32,
}

/// One album directory and every link that goes into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPlan {
    pub path: PathBuf,
    pub links: Vec<PlannedLink>,
}

/// The complete layout of the output tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    pub users: Vec<UserLink>,
    pub directories: Vec<DirectoryPlan>,
    /// Items dropped because the same target was already linked from the
    /// same directory.
    pub duplicates: usize,
}
impl LinkPlan {
    /// Total number of links in the plan, `users/` links included.
    pub fn links(&self) -> usize {
        self.users.len() + self.directories.iter().map(|d| d.links.len()).sum::<usize>()
    }
}

/// Make an album name or filename usable as a single path component.
///
/// Separators and NUL bytes become `_`, and names that would mean something
/// special to the filesystem (empty, `.`, `..`) are replaced entirely.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name.chars().map(|c| if matches!(c, '/' | '\0') { '_' } else { c }).collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Lay out every album as links.
///
/// Albums landing in the same directory (same year and name, across users
/// under [`MergePolicy::Merge`]) share it. Within a directory, names are
/// claimed in a fixed order (albums by user then id, items by filename then
/// folder): the first claimant of a filename keeps it, later ones get the
/// owning user's index appended (`img_u1.jpg`, then `img_u1_2.jpg`, ...).
/// Names are compared case-insensitively so the layout also holds on
/// case-insensitive filesystems.
///
/// Items found in the shared tree point below `shared_root`; they are dropped
/// when it isn't set.
pub fn plan(users: &[User], shared_root: Option<&Path>, albums: Vec<AlbumRecord>, merge: MergePolicy) -> LinkPlan {
    let mut roots: HashMap<u32, &Path> = users.iter().map(|u| (u.index, u.photo_root.as_path())).collect();
    let mut user_links: Vec<_> = users
        .iter()
        .map(|u| UserLink {
            user: u.index,
            link: Path::new("users").join(u.index.to_string()),
            target: u.photo_root.clone(),
        })
        .collect();
    if let Some(shared) = shared_root {
        roots.insert(SHARED_SPACE, shared);
        user_links.push(UserLink {
            user: SHARED_SPACE,
            link: PathBuf::from("users/shared"),
            target: shared.to_path_buf(),
        });
    }

    let mut albums = albums;
    albums.sort_by_key(|a| (a.user, a.album_id));
    let mut groups: BTreeMap<String, (PathBuf, Vec<AlbumRecord>)> = BTreeMap::new();
    for album in albums {
        let name = match merge {
            MergePolicy::Merge => sanitize(&album.name),
            MergePolicy::Split => format!("{} [{}]", sanitize(&album.name), album.user),
        };
        let path = Path::new("albums").join(album.year.to_string()).join(name);
        let key = path.to_string_lossy().to_lowercase();
        groups.entry(key).or_insert_with(|| (path, Vec::new())).1.push(album);
    }

    let mut duplicates = 0;
    let mut directories = Vec::with_capacity(groups.len());
    for (path, albums) in groups.into_values() {
        let mut claimed = HashSet::new();
        let mut targets = HashSet::new();
        let mut links = Vec::new();
        for album in albums {
            if !roots.contains_key(&album.user) {
                tracing::debug!(user = album.user, album = %album.name, "Album of unknown user; skipping");
                continue;
            }
            let mut items = album.items;
            items.sort_by(|a, b| (&a.filename, &a.relative_path).cmp(&(&b.filename, &b.relative_path)));
            for item in items {
                let Some(root) = roots.get(&item.owner) else {
                    tracing::debug!(owner = item.owner, filename = %item.filename, "Item outside any known root");
                    continue;
                };
                let target = root.join(&item.relative_path).join(&item.filename);
                if !targets.insert(target.clone()) {
                    tracing::debug!(directory = %path.display(), target = %target.display(), "Duplicate item");
                    duplicates += 1;
                    continue;
                }
                let name = claim(&mut claimed, sanitize(&item.filename), album.user);
                links.push(PlannedLink { link: path.join(name), target, user: album.user });
            }
        }
        directories.push(DirectoryPlan { path, links });
    }

    LinkPlan { users: user_links, directories, duplicates }
}

/// Claim a free name in a directory, suffixing with the user index on
/// collision.
fn claim(claimed: &mut HashSet<String>, filename: String, user: u32) -> String {
    if claimed.insert(filename.to_lowercase()) {
        return filename;
    }
    let (stem, extension) = split_extension(&filename);
    let candidate = format!("{stem}_u{user}{extension}");
    if claimed.insert(candidate.to_lowercase()) {
        return candidate;
    }
    (2..)
        .map(|n| format!("{stem}_u{user}_{n}{extension}"))
        .find(|candidate| claimed.insert(candidate.to_lowercase()))
        .unwrap_or(candidate)
}

/// Split `name.ext` into `("name", ".ext")`. Dotfiles have no extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename.split_at(i),
        _ => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::albums::{AlbumYear, ResolvedItem};
    use albumlink_photos::Credentials;
    use rstest::rstest;

    fn user(index: u32, root: &str) -> User {
        User {
            index,
            username: format!("user{index}"),
            credentials: Credentials::new("secret"),
            photo_root: PathBuf::from(root),
        }
    }

    fn item(filename: &str, folder: &str) -> ResolvedItem {
        ResolvedItem { filename: filename.to_string(), folder_id: 1, owner: 0, relative_path: PathBuf::from(folder) }
    }

    fn owned(owner: u32, filename: &str, folder: &str) -> ResolvedItem {
        ResolvedItem { owner, ..item(filename, folder) }
    }

    fn album(user: u32, id: u64, name: &str, year: i32, items: Vec<ResolvedItem>) -> AlbumRecord {
        AlbumRecord { user, album_id: id, name: name.to_string(), year: AlbumYear::Known(year), items }
    }

    fn links(plan: &LinkPlan) -> Vec<(String, String)> {
        plan.directories
            .iter()
            .flat_map(|d| &d.links)
            .map(|l| (l.link.display().to_string(), l.target.display().to_string()))
            .collect()
    }

    #[rstest]
    #[case("Weihnachten 21", "Weihnachten 21")]
    #[case("Urlaub 2020/21", "Urlaub 2020_21")]
    #[case("a\0b", "a_b")]
    #[case("", "_")]
    #[case(".", "_")]
    #[case("..", "_")]
    #[case("...", "...")]
    fn test_sanitize(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize(name), expected);
    }

    #[rstest]
    #[case("img.jpg", ("img", ".jpg"))]
    #[case("archive.tar.gz", ("archive.tar", ".gz"))]
    #[case(".hidden", (".hidden", ""))]
    #[case("README", ("README", ""))]
    fn test_split_extension(#[case] filename: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_extension(filename), expected);
    }

    #[test]
    fn test_scenario() {
        let users = [user(0, "/Volumes/photo")];
        let albums = vec![album(0, 7, "Weihnachten 21", 2021, vec![item("img1.jpg", "Pictures/2021")])];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(plan.users, vec![UserLink {
            user: 0,
            link: PathBuf::from("users/0"),
            target: PathBuf::from("/Volumes/photo"),
        }]);
        assert_eq!(links(&plan), vec![(
            "albums/2021/Weihnachten 21/img1.jpg".to_string(),
            "/Volumes/photo/Pictures/2021/img1.jpg".to_string()
        )]);
    }

    #[test]
    fn test_merge_across_users() {
        let users = [user(0, "/a"), user(1, "/b")];
        let albums = vec![
            album(1, 3, "Weihnachten 24", 2024, vec![item("img1.jpg", "X"), item("img2.jpg", "X")]),
            album(0, 9, "Weihnachten 24", 2024, vec![item("img1.jpg", "Y")]),
        ];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(plan.directories.len(), 1);
        assert_eq!(links(&plan), vec![
            ("albums/2024/Weihnachten 24/img1.jpg".to_string(), "/a/Y/img1.jpg".to_string()),
            ("albums/2024/Weihnachten 24/img1_u1.jpg".to_string(), "/b/X/img1.jpg".to_string()),
            ("albums/2024/Weihnachten 24/img2.jpg".to_string(), "/b/X/img2.jpg".to_string()),
        ]);
    }

    #[test]
    fn test_split_policy() {
        let users = [user(0, "/a"), user(1, "/b")];
        let albums = vec![
            album(0, 1, "Weihnachten 24", 2024, vec![item("img1.jpg", "X")]),
            album(1, 1, "Weihnachten 24", 2024, vec![item("img1.jpg", "X")]),
        ];
        let plan = plan(&users, None, albums, MergePolicy::Split);
        let paths: Vec<_> = plan.directories.iter().map(|d| d.path.display().to_string()).collect();
        assert_eq!(paths, vec!["albums/2024/Weihnachten 24 [0]", "albums/2024/Weihnachten 24 [1]"]);
        assert_eq!(plan.links(), 4);
    }

    #[test]
    fn test_repeated_collisions_for_one_user() {
        let users = [user(0, "/a")];
        let albums = vec![album(0, 1, "A", 2020, vec![item("x.jpg", "1"), item("x.jpg", "2"), item("X.JPG", "3")])];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        let names: Vec<_> = plan.directories[0].links.iter().map(|l| l.link.display().to_string()).collect();
        assert_eq!(names, vec!["albums/2020/A/X.JPG", "albums/2020/A/x_u0.jpg", "albums/2020/A/x_u0_2.jpg"]);
    }

    #[test]
    fn test_same_photo_in_two_merged_albums() {
        let users = [user(0, "/a")];
        let albums = vec![
            album(0, 1, "A", 2020, vec![item("x.jpg", "1")]),
            album(0, 2, "A", 2020, vec![item("x.jpg", "1"), item("y.jpg", "1")]),
        ];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(plan.duplicates, 1);
        assert_eq!(plan.directories[0].links.len(), 2);
    }

    #[test]
    fn test_case_insensitive_directories_share() {
        let users = [user(0, "/a")];
        let albums =
            vec![album(0, 1, "Urlaub", 2020, vec![item("x.jpg", "1")]), album(0, 2, "urlaub", 2020, vec![item("x.jpg", "2")])];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(plan.directories.len(), 1);
        assert_eq!(plan.directories[0].path, Path::new("albums/2020/Urlaub"));
    }

    #[test]
    fn test_deterministic() {
        let users = [user(0, "/a"), user(1, "/b")];
        let albums = vec![
            album(0, 1, "A", 2020, vec![item("x.jpg", "1"), item("y.jpg", "1")]),
            album(1, 4, "A", 2020, vec![item("x.jpg", "2")]),
            album(1, 2, "B", 2021, vec![item("z.jpg", "2")]),
        ];
        let mut reversed = albums.clone();
        reversed.reverse();
        for album in &mut reversed {
            album.items.reverse();
        }
        assert_eq!(plan(&users, None, albums, MergePolicy::Merge), plan(&users, None, reversed, MergePolicy::Merge));
    }

    #[test]
    fn test_unknown_year_and_unsafe_names() {
        let users = [user(0, "/a")];
        let albums = vec![AlbumRecord {
            user: 0,
            album_id: 1,
            name: "../escape".to_string(),
            year: AlbumYear::Unknown,
            items: vec![item("a/b.jpg", "1")],
        }];
        let plan = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(plan.directories[0].path, Path::new("albums/unknown/.._escape"));
        assert_eq!(plan.directories[0].links[0].link, Path::new("albums/unknown/.._escape/a_b.jpg"));
    }

    #[test]
    fn test_shared_items_point_into_shared_root() {
        let users = [user(0, "/a"), user(1, "/b")];
        let albums = vec![
            album(0, 1, "Fest", 2022, vec![owned(0, "x.jpg", "1"), owned(SHARED_SPACE, "team.jpg", "Events")]),
            album(1, 2, "Fest", 2022, vec![owned(1, "y.jpg", "2"), owned(SHARED_SPACE, "team.jpg", "Events")]),
        ];
        let planned = plan(&users, Some(Path::new("/team")), albums.clone(), MergePolicy::Merge);
        assert_eq!(planned.users.last(), Some(&UserLink {
            user: SHARED_SPACE,
            link: PathBuf::from("users/shared"),
            target: PathBuf::from("/team"),
        }));
        // Both users reference the same shared photo: one link.
        assert_eq!(planned.duplicates, 1);
        assert_eq!(links(&planned), vec![
            ("albums/2022/Fest/team.jpg".to_string(), "/team/Events/team.jpg".to_string()),
            ("albums/2022/Fest/x.jpg".to_string(), "/a/1/x.jpg".to_string()),
            ("albums/2022/Fest/y.jpg".to_string(), "/b/2/y.jpg".to_string()),
        ]);

        let planned = plan(&users, None, albums, MergePolicy::Merge);
        assert_eq!(planned.users.len(), 2);
        assert_eq!(planned.links(), 4);
    }
}
