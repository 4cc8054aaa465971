/// Lines of `buffer` that contain `marker`, in the order they appear.
///
/// A line ends at `\n` or at the end of the buffer; a trailing `\r` is not
/// part of the line, and a final newline does not produce an empty line.
/// Matching is plain substring containment.
pub fn matching_lines<'a>(buffer: &'a str, marker: &str) -> Vec<&'a str> {
    buffer
        .lines()
        .filter(|line| line.contains(marker))
        .collect()
}
